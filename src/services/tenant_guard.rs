use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::audit_log::CreateAuditLog;
use crate::models::workspace::MemberRole;
use crate::repository::PrequalStore;
use crate::services::audit_service::AuditService;

const MAX_WORKSPACE_ID_LEN: usize = 128;

/// Request metadata recorded with every access attempt.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    pub caller_id: Option<String>,
    pub resource_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AccessContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn caller(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: Some(caller_id.into()),
            ..Default::default()
        }
    }

    pub fn with_resource(mut self, resource_id: impl ToString) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedAccess {
    pub verified: bool,
    pub workspace_id: String,
    pub caller_id: Option<String>,
    pub role: Option<MemberRole>,
}

/// Fails with `TenantMismatch` unless the resource belongs to the requested
/// workspace. Run on everything fetched by primary key.
pub fn verify_resource_ownership(
    resource_workspace_id: &str,
    requested_workspace_id: &str,
) -> Result<()> {
    if resource_workspace_id != requested_workspace_id {
        return Err(Error::TenantMismatch);
    }
    Ok(())
}

fn is_valid_workspace_id(workspace_id: &str) -> bool {
    !workspace_id.is_empty()
        && workspace_id.len() <= MAX_WORKSPACE_ID_LEN
        && workspace_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Clone)]
pub struct TenantGuard {
    store: Arc<dyn PrequalStore>,
    audit: AuditService,
}

impl TenantGuard {
    pub fn new(store: Arc<dyn PrequalStore>, audit: AuditService) -> Self {
        Self { store, audit }
    }

    pub async fn verify_access(
        &self,
        workspace_id: &str,
        operation: &str,
        ctx: &AccessContext,
    ) -> Result<VerifiedAccess> {
        let outcome = self.check_access(workspace_id, ctx).await;
        let failure_reason = outcome.as_ref().err().map(|e| e.code().to_string());

        if let Some(reason) = &failure_reason {
            tracing::warn!(
                workspace_id = %workspace_id,
                operation = %operation,
                caller_id = ?ctx.caller_id,
                reason = %reason,
                "Tenant access denied"
            );
        }

        self.audit
            .log(CreateAuditLog {
                workspace_id: workspace_id.to_string(),
                caller_id: ctx.caller_id.clone(),
                operation: operation.to_string(),
                resource_id: ctx.resource_id.clone(),
                success: outcome.is_ok(),
                failure_reason,
                ip_address: ctx.ip_address.clone(),
                user_agent: ctx.user_agent.clone(),
            })
            .await;

        outcome
    }

    async fn check_access(&self, workspace_id: &str, ctx: &AccessContext) -> Result<VerifiedAccess> {
        if !is_valid_workspace_id(workspace_id) {
            return Err(Error::InvalidWorkspaceId);
        }

        if self.store.find_workspace(workspace_id).await?.is_none() {
            return Err(Error::WorkspaceNotFound(workspace_id.to_string()));
        }

        let Some(caller_id) = ctx.caller_id.as_deref() else {
            return Ok(VerifiedAccess {
                verified: true,
                workspace_id: workspace_id.to_string(),
                caller_id: None,
                role: None,
            });
        };

        let membership = self
            .store
            .find_membership(workspace_id, caller_id)
            .await?
            .ok_or(Error::AccessDenied)?;

        Ok(VerifiedAccess {
            verified: true,
            workspace_id: workspace_id.to_string(),
            caller_id: Some(caller_id.to_string()),
            role: Some(membership.role),
        })
    }

    /// Ownership check for a resource fetched by id; failures are audited
    /// so that a wrong-tenant probe stays distinguishable from a miss.
    pub async fn check_ownership(
        &self,
        operation: &str,
        resource_workspace_id: &str,
        requested_workspace_id: &str,
        resource_id: &str,
    ) -> Result<()> {
        let outcome = verify_resource_ownership(resource_workspace_id, requested_workspace_id);
        if let Err(e) = &outcome {
            tracing::warn!(
                requested_workspace_id = %requested_workspace_id,
                resource_id = %resource_id,
                operation = %operation,
                "Cross-tenant resource access rejected"
            );
            self.record_failure(requested_workspace_id, operation, resource_id, e)
                .await;
        }
        outcome
    }

    pub async fn record_failure(
        &self,
        workspace_id: &str,
        operation: &str,
        resource_id: &str,
        error: &Error,
    ) {
        self.audit
            .log(CreateAuditLog {
                workspace_id: workspace_id.to_string(),
                operation: operation.to_string(),
                resource_id: Some(resource_id.to_string()),
                success: false,
                failure_reason: Some(error.code().to_string()),
                ..Default::default()
            })
            .await;
    }
}
