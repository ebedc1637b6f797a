use std::sync::Arc;

use crate::models::audit_log::CreateAuditLog;
use crate::repository::PrequalStore;

#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn PrequalStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn PrequalStore>) -> Self {
        Self { store }
    }

    /// Appends one audit record. A failed write is logged and dropped so it
    /// never changes the outcome the caller sees.
    pub async fn log(&self, entry: CreateAuditLog) {
        let operation = entry.operation.clone();
        let workspace_id = entry.workspace_id.clone();
        if let Err(e) = self.store.insert_audit_log(entry).await {
            tracing::error!(
                error = ?e,
                operation = %operation,
                workspace_id = %workspace_id,
                "Failed to write tenant audit record"
            );
        }
    }
}
