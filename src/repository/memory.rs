use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PrequalStore;
use crate::error::{Error, Result};
use crate::models::audit_log::{AuditLog, CreateAuditLog};
use crate::models::message::{Conversation, CreateMessage, DialogueMessage};
use crate::models::prequal_config::StoredPrequalConfig;
use crate::models::response::CandidateResponse;
use crate::models::session::{PrequalificationSession, SessionPatch, SessionStatus};
use crate::models::vacancy::Vacancy;
use crate::models::workspace::{MemberRole, Membership, Workspace};

#[derive(Default)]
struct MemoryState {
    workspaces: HashMap<String, Workspace>,
    memberships: HashMap<(String, String), Membership>,
    vacancies: HashMap<Uuid, Vacancy>,
    configs: HashMap<String, StoredPrequalConfig>,
    sessions: HashMap<Uuid, PrequalificationSession>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<DialogueMessage>,
    responses: Vec<CandidateResponse>,
    audit_logs: Vec<AuditLog>,
}

/// Process-local store. Every operation runs under one lock, which gives
/// the same all-or-nothing writes the Postgres store gets from single
/// statements and transactions.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    fail_audit_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("in-memory store lock poisoned".to_string()))
    }

    pub fn add_workspace(&self, id: &str, name: &str) -> Result<()> {
        self.state()?.workspaces.insert(
            id.to_string(),
            Workspace {
                id: id.to_string(),
                name: name.to_string(),
                created_at: Some(Utc::now()),
            },
        );
        Ok(())
    }

    pub fn add_member(&self, workspace_id: &str, user_id: &str, role: MemberRole) -> Result<()> {
        self.state()?.memberships.insert(
            (workspace_id.to_string(), user_id.to_string()),
            Membership {
                workspace_id: workspace_id.to_string(),
                user_id: user_id.to_string(),
                role,
            },
        );
        Ok(())
    }

    pub fn add_vacancy(&self, vacancy: Vacancy) -> Result<()> {
        self.state()?.vacancies.insert(vacancy.id, vacancy);
        Ok(())
    }

    pub fn set_prequal_config(&self, config: StoredPrequalConfig) -> Result<()> {
        self.state()?
            .configs
            .insert(config.workspace_id.clone(), config);
        Ok(())
    }

    /// Makes subsequent audit inserts fail, for exercising the swallow path.
    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    pub fn audit_logs(&self) -> Result<Vec<AuditLog>> {
        Ok(self.state()?.audit_logs.clone())
    }

    pub fn responses(&self) -> Result<Vec<CandidateResponse>> {
        Ok(self.state()?.responses.clone())
    }

    pub fn session_count(&self) -> Result<usize> {
        Ok(self.state()?.sessions.len())
    }
}

#[async_trait]
impl PrequalStore for InMemoryStore {
    async fn find_workspace(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        Ok(self.state()?.workspaces.get(workspace_id).cloned())
    }

    async fn find_membership(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>> {
        Ok(self
            .state()?
            .memberships
            .get(&(workspace_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn find_vacancy(&self, vacancy_id: Uuid, workspace_id: &str) -> Result<Option<Vacancy>> {
        Ok(self
            .state()?
            .vacancies
            .get(&vacancy_id)
            .filter(|vacancy| vacancy.workspace_id == workspace_id)
            .cloned())
    }

    async fn find_prequal_config(
        &self,
        workspace_id: &str,
    ) -> Result<Option<StoredPrequalConfig>> {
        Ok(self.state()?.configs.get(workspace_id).cloned())
    }

    async fn insert_session(
        &self,
        session: PrequalificationSession,
    ) -> Result<PrequalificationSession> {
        let mut state = self.state()?;
        if state.sessions.contains_key(&session.id) {
            return Err(Error::Internal(format!("duplicate session id {}", session.id)));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<PrequalificationSession>> {
        Ok(self.state()?.sessions.get(&session_id).cloned())
    }

    async fn update_session(
        &self,
        session_id: Uuid,
        expected: Option<SessionStatus>,
        patch: SessionPatch,
    ) -> Result<Option<PrequalificationSession>> {
        let mut state = self.state()?;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        if expected.is_some_and(|status| session.status != status) {
            return Ok(None);
        }
        patch.apply_to(session, Utc::now());
        Ok(Some(session.clone()))
    }

    async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state()?;
        let mut expired = 0;
        for session in state.sessions.values_mut() {
            if !session.status.is_terminal() && session.is_past_deadline(now) {
                session.status = SessionStatus::Expired;
                session.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn insert_conversation(&self, session_id: Uuid) -> Result<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            session_id,
            created_at: Utc::now(),
        };
        self.state()?
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn insert_message(&self, message: CreateMessage) -> Result<DialogueMessage> {
        let mut state = self.state()?;
        if !state.conversations.contains_key(&message.conversation_id) {
            return Err(Error::Internal(format!(
                "conversation {} does not exist",
                message.conversation_id
            )));
        }
        let stored = DialogueMessage {
            id: Uuid::new_v4(),
            conversation_id: message.conversation_id,
            role: message.role,
            content: message.content,
            created_at: Utc::now(),
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<DialogueMessage>> {
        Ok(self
            .state()?
            .messages
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn submit_session(
        &self,
        session_id: Uuid,
        response: CandidateResponse,
    ) -> Result<Option<PrequalificationSession>> {
        let mut state = self.state()?;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        if session.status != SessionStatus::Completed || session.response_id.is_some() {
            return Ok(None);
        }
        session.status = SessionStatus::Submitted;
        session.response_id = Some(response.id);
        session.updated_at = Utc::now();
        let updated = session.clone();
        state.responses.push(response);
        Ok(Some(updated))
    }

    async fn insert_audit_log(&self, entry: CreateAuditLog) -> Result<AuditLog> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("audit storage unavailable".to_string()));
        }
        let log = AuditLog {
            id: Uuid::new_v4(),
            workspace_id: entry.workspace_id,
            caller_id: entry.caller_id,
            operation: entry.operation,
            resource_id: entry.resource_id,
            success: entry.success,
            failure_reason: entry.failure_reason,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: Utc::now(),
        };
        self.state()?.audit_logs.push(log.clone());
        Ok(log)
    }
}
