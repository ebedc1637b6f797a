pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::audit_log::{AuditLog, CreateAuditLog};
use crate::models::message::{Conversation, CreateMessage, DialogueMessage};
use crate::models::prequal_config::StoredPrequalConfig;
use crate::models::response::CandidateResponse;
use crate::models::session::{PrequalificationSession, SessionPatch, SessionStatus};
use crate::models::vacancy::Vacancy;
use crate::models::workspace::{Membership, Workspace};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Persistence seam for the prequalification core.
///
/// Lookups by primary key do not filter by tenant; callers re-check
/// ownership on everything they fetch that way.
#[async_trait]
pub trait PrequalStore: Send + Sync {
    async fn find_workspace(&self, workspace_id: &str) -> Result<Option<Workspace>>;

    async fn find_membership(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>>;

    /// Tenant-scoped vacancy lookup.
    async fn find_vacancy(&self, vacancy_id: Uuid, workspace_id: &str) -> Result<Option<Vacancy>>;

    async fn find_prequal_config(&self, workspace_id: &str)
        -> Result<Option<StoredPrequalConfig>>;

    async fn insert_session(
        &self,
        session: PrequalificationSession,
    ) -> Result<PrequalificationSession>;

    async fn find_session(&self, session_id: Uuid) -> Result<Option<PrequalificationSession>>;

    /// Applies `patch` in one write. When `expected` is set the write only
    /// happens if the stored status still equals it; `None` is returned when
    /// the row is missing or the precondition failed.
    async fn update_session(
        &self,
        session_id: Uuid,
        expected: Option<SessionStatus>,
        patch: SessionPatch,
    ) -> Result<Option<PrequalificationSession>>;

    /// Moves every non-terminal session whose deadline passed to `expired`.
    async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn insert_conversation(&self, session_id: Uuid) -> Result<Conversation>;

    async fn insert_message(&self, message: CreateMessage) -> Result<DialogueMessage>;

    /// Messages of one conversation in creation order.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<DialogueMessage>>;

    /// Stores the response and moves the session `completed -> submitted`
    /// atomically. Returns `None` without writing anything if the session
    /// is not `completed` or already carries a response.
    async fn submit_session(
        &self,
        session_id: Uuid,
        response: CandidateResponse,
    ) -> Result<Option<PrequalificationSession>>;

    async fn insert_audit_log(&self, entry: CreateAuditLog) -> Result<AuditLog>;
}
