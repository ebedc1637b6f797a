use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::evaluation::EvaluationResult;
use crate::models::prequal_config::{resolve_effective_config, PrequalConfig};
use crate::models::response::CandidateResponse;
use crate::models::resume::ParsedResume;
use crate::models::session::{
    PrequalificationSession, SessionPatch, SessionSource, SessionStatus,
};
use crate::models::vacancy::Vacancy;
use crate::repository::PrequalStore;
use crate::services::tenant_guard::TenantGuard;
use crate::utils::time::now;

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub workspace_id: String,
    pub vacancy_id: Uuid,
    pub candidate_consent: bool,
    pub source: SessionSource,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApplicationContact {
    pub candidate_name: String,
    pub candidate_email: Option<String>,
    pub candidate_phone: Option<String>,
    pub cover_letter: Option<String>,
}

/// Owns the session lifecycle. Every read re-checks tenant ownership and
/// every write is a conditional update keyed on the status it was
/// validated against.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn PrequalStore>,
    guard: TenantGuard,
    defaults: PrequalConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn PrequalStore>, guard: TenantGuard, defaults: PrequalConfig) -> Self {
        Self {
            store,
            guard,
            defaults,
        }
    }

    pub async fn resolve_config(&self, workspace_id: &str) -> Result<PrequalConfig> {
        let stored = self.store.find_prequal_config(workspace_id).await?;
        Ok(resolve_effective_config(stored.as_ref(), &self.defaults))
    }

    pub async fn find_vacancy(&self, vacancy_id: Uuid, workspace_id: &str) -> Result<Vacancy> {
        self.store
            .find_vacancy(vacancy_id, workspace_id)
            .await?
            .ok_or_else(|| Error::VacancyNotFound(vacancy_id.to_string()))
    }

    pub async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<PrequalificationSession> {
        if !req.candidate_consent {
            return Err(Error::ConsentRequired);
        }

        self.find_vacancy(req.vacancy_id, &req.workspace_id).await?;
        let config = self.resolve_config(&req.workspace_id).await?;

        let created_at = now();
        let session = PrequalificationSession {
            id: Uuid::new_v4(),
            workspace_id: req.workspace_id,
            vacancy_id: req.vacancy_id,
            status: SessionStatus::ResumePending,
            source: req.source,
            consent_given_at: Some(created_at),
            expires_at: created_at + Duration::minutes(config.session_timeout_minutes as i64),
            parsed_resume: None,
            conversation_id: None,
            fit_score: None,
            fit_decision: None,
            evaluation: None,
            candidate_feedback: None,
            response_id: None,
            user_agent: req.user_agent,
            ip_address: req.ip_address,
            created_at,
            updated_at: created_at,
        };

        let session = self.store.insert_session(session).await?;
        tracing::info!(
            session_id = %session.id,
            workspace_id = %session.workspace_id,
            vacancy_id = %session.vacancy_id,
            expires_at = %session.expires_at,
            "Prequalification session created"
        );
        Ok(session)
    }

    /// Fetches a session for `workspace_id`, expiring it on the way if its
    /// deadline passed.
    pub async fn get_session(
        &self,
        session_id: Uuid,
        workspace_id: &str,
    ) -> Result<PrequalificationSession> {
        let Some(session) = self.store.find_session(session_id).await? else {
            let err = Error::SessionNotFound(session_id.to_string());
            self.guard
                .record_failure(workspace_id, "session.get", &session_id.to_string(), &err)
                .await;
            return Err(err);
        };

        self.guard
            .check_ownership(
                "session.get",
                &session.workspace_id,
                workspace_id,
                &session_id.to_string(),
            )
            .await?;

        let mut current = session;
        // One retry: a concurrent writer may have moved the session to
        // another live status after its deadline passed.
        for _ in 0..2 {
            if current.status.is_terminal() || !current.is_past_deadline(now()) {
                return Ok(current);
            }
            let from = current.status;
            match self
                .store
                .update_session(session_id, Some(from), SessionPatch::status(SessionStatus::Expired))
                .await?
            {
                Some(expired) => {
                    tracing::info!(
                        session_id = %session_id,
                        workspace_id = %workspace_id,
                        from = %from,
                        "Session expired"
                    );
                    return Ok(expired);
                }
                None => {
                    current = self
                        .store
                        .find_session(session_id)
                        .await?
                        .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
                }
            }
        }
        Ok(current)
    }

    pub async fn update_session_status(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        new_status: SessionStatus,
    ) -> Result<PrequalificationSession> {
        let current = self.get_session(session_id, workspace_id).await?;
        self.transition(&current, new_status, SessionPatch::default())
            .await
    }

    /// Persists the resume and moves `resume_pending -> dialogue_active` in
    /// a single write.
    pub async fn save_resume_and_advance(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        parsed_resume: ParsedResume,
    ) -> Result<PrequalificationSession> {
        let current = self.get_session(session_id, workspace_id).await?;
        if current.status != SessionStatus::ResumePending {
            return Err(Error::InvalidStateTransition {
                from: current.status,
                to: SessionStatus::DialogueActive,
            });
        }

        let patch = SessionPatch {
            parsed_resume: Some(parsed_resume),
            ..Default::default()
        };
        self.transition(&current, SessionStatus::DialogueActive, patch)
            .await
    }

    /// Links a conversation onto the session. The first link wins; the
    /// returned session carries the conversation id actually stored.
    pub async fn link_conversation(
        &self,
        session: &PrequalificationSession,
        conversation_id: Uuid,
    ) -> Result<PrequalificationSession> {
        let patch = SessionPatch {
            conversation_id: Some(conversation_id),
            ..Default::default()
        };
        match self
            .store
            .update_session(session.id, Some(session.status), patch)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                let actual = self.get_session(session.id, &session.workspace_id).await?;
                Err(Error::InvalidStateTransition {
                    from: actual.status,
                    to: session.status,
                })
            }
        }
    }

    /// Stores the evaluation outcome and moves `evaluating -> completed`.
    pub async fn complete_evaluation(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        evaluation: EvaluationResult,
        candidate_feedback: String,
    ) -> Result<PrequalificationSession> {
        let current = self.get_session(session_id, workspace_id).await?;
        let patch = SessionPatch {
            fit_score: Some(evaluation.fit_score),
            fit_decision: Some(evaluation.fit_decision),
            evaluation: Some(evaluation),
            candidate_feedback: Some(candidate_feedback),
            ..Default::default()
        };
        self.transition(&current, SessionStatus::Completed, patch)
            .await
    }

    /// Records the application and moves `completed -> submitted`; the
    /// response id is set exactly once.
    pub async fn submit_application(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        contact: ApplicationContact,
    ) -> Result<(PrequalificationSession, CandidateResponse)> {
        let current = self.get_session(session_id, workspace_id).await?;
        if current.status != SessionStatus::Completed {
            return Err(Error::InvalidStateTransition {
                from: current.status,
                to: SessionStatus::Submitted,
            });
        }

        let response = CandidateResponse {
            id: Uuid::new_v4(),
            workspace_id: current.workspace_id.clone(),
            vacancy_id: current.vacancy_id,
            session_id: current.id,
            candidate_name: contact.candidate_name,
            candidate_email: contact.candidate_email,
            candidate_phone: contact.candidate_phone,
            cover_letter: contact.cover_letter,
            fit_score: current.fit_score,
            created_at: now(),
        };

        match self.store.submit_session(session_id, response.clone()).await? {
            Some(submitted) => {
                tracing::info!(
                    session_id = %session_id,
                    workspace_id = %workspace_id,
                    response_id = %response.id,
                    "Application submitted"
                );
                Ok((submitted, response))
            }
            None => {
                let actual = self.get_session(session_id, workspace_id).await?;
                Err(Error::InvalidStateTransition {
                    from: actual.status,
                    to: SessionStatus::Submitted,
                })
            }
        }
    }

    pub async fn expire_overdue_sessions(&self) -> Result<u64> {
        let expired = self.store.expire_overdue_sessions(now()).await?;
        if expired > 0 {
            tracing::info!(count = expired, "Expired overdue prequalification sessions");
        }
        Ok(expired)
    }

    async fn transition(
        &self,
        current: &PrequalificationSession,
        to: SessionStatus,
        mut patch: SessionPatch,
    ) -> Result<PrequalificationSession> {
        let from = current.status;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidStateTransition { from, to });
        }
        if from == SessionStatus::ConsentPending
            && to == SessionStatus::ResumePending
            && current.consent_given_at.is_none()
        {
            return Err(Error::ConsentRequired);
        }

        patch.status = Some(to);
        match self
            .store
            .update_session(current.id, Some(from), patch)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    session_id = %current.id,
                    workspace_id = %current.workspace_id,
                    from = %from,
                    to = %to,
                    "Session status changed"
                );
                Ok(updated)
            }
            None => {
                let actual = self
                    .store
                    .find_session(current.id)
                    .await?
                    .ok_or_else(|| Error::SessionNotFound(current.id.to_string()))?;
                tracing::warn!(
                    session_id = %current.id,
                    expected = %from,
                    actual = %actual.status,
                    to = %to,
                    "Concurrent status change rejected"
                );
                Err(Error::InvalidStateTransition {
                    from: actual.status,
                    to,
                })
            }
        }
    }
}
