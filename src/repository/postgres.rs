use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::PrequalStore;
use crate::error::{Error, Result};
use crate::models::audit_log::{AuditLog, CreateAuditLog};
use crate::models::evaluation::EvaluationResult;
use crate::models::message::{Conversation, CreateMessage, DialogueMessage};
use crate::models::prequal_config::StoredPrequalConfig;
use crate::models::response::CandidateResponse;
use crate::models::resume::ParsedResume;
use crate::models::session::{PrequalificationSession, SessionPatch, SessionStatus};
use crate::models::vacancy::Vacancy;
use crate::models::workspace::{Membership, Workspace};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    workspace_id: String,
    vacancy_id: Uuid,
    status: String,
    source: String,
    consent_given_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    parsed_resume: Option<Json<ParsedResume>>,
    conversation_id: Option<Uuid>,
    fit_score: Option<i32>,
    fit_decision: Option<String>,
    evaluation: Option<Json<EvaluationResult>>,
    candidate_feedback: Option<String>,
    response_id: Option<Uuid>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for PrequalificationSession {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            workspace_id: row.workspace_id,
            vacancy_id: row.vacancy_id,
            status: row.status.parse().map_err(Error::Internal)?,
            source: row.source.parse().map_err(Error::Internal)?,
            consent_given_at: row.consent_given_at,
            expires_at: row.expires_at,
            parsed_resume: row.parsed_resume.map(|json| json.0),
            conversation_id: row.conversation_id,
            fit_score: row.fit_score,
            fit_decision: row
                .fit_decision
                .map(|decision| decision.parse())
                .transpose()
                .map_err(Error::Internal)?,
            evaluation: row.evaluation.map(|json| json.0),
            candidate_feedback: row.candidate_feedback,
            response_id: row.response_id,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for DialogueMessage {
    type Error = Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            conversation_id: row.conversation_id,
            role: row.role.parse().map_err(Error::Internal)?,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ConfigRow {
    workspace_id: String,
    pass_threshold: Option<i32>,
    mandatory_questions: Option<Vec<String>>,
    tone: Option<String>,
    honesty_level: Option<String>,
    max_dialogue_turns: Option<i32>,
    session_timeout_minutes: Option<i32>,
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    workspace_id: String,
    caller_id: Option<String>,
    operation: String,
    resource_id: Option<String>,
    success: bool,
    failure_reason: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = r#"
    id, workspace_id, vacancy_id, status, source, consent_given_at, expires_at,
    parsed_resume, conversation_id, fit_score, fit_decision, evaluation,
    candidate_feedback, response_id, user_agent, ip_address, created_at, updated_at
"#;

#[async_trait]
impl PrequalStore for PgStore {
    async fn find_workspace(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"SELECT id, name, created_at FROM workspaces WHERE id = $1"#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(workspace)
    }

    async fn find_membership(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT workspace_id, user_id, role FROM workspace_members
            WHERE workspace_id = $1 AND user_id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(workspace_id, user_id, role)| {
            Ok(Membership {
                workspace_id,
                user_id,
                role: role.parse().map_err(Error::Internal)?,
            })
        })
        .transpose()
    }

    async fn find_vacancy(&self, vacancy_id: Uuid, workspace_id: &str) -> Result<Option<Vacancy>> {
        let vacancy = sqlx::query_as::<_, Vacancy>(
            r#"
            SELECT id, workspace_id, title, description, requirements,
                   salary_from, salary_to, currency, created_at
            FROM vacancies
            WHERE id = $1 AND workspace_id = $2
            "#,
        )
        .bind(vacancy_id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vacancy)
    }

    async fn find_prequal_config(
        &self,
        workspace_id: &str,
    ) -> Result<Option<StoredPrequalConfig>> {
        let row = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT workspace_id, pass_threshold, mandatory_questions, tone, honesty_level,
                   max_dialogue_turns, session_timeout_minutes
            FROM workspace_prequal_configs
            WHERE workspace_id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(StoredPrequalConfig {
            workspace_id: row.workspace_id,
            pass_threshold: row.pass_threshold,
            mandatory_questions: row.mandatory_questions,
            tone: row.tone.map(|t| t.parse()).transpose().map_err(Error::Internal)?,
            honesty_level: row
                .honesty_level
                .map(|h| h.parse())
                .transpose()
                .map_err(Error::Internal)?,
            max_dialogue_turns: row.max_dialogue_turns,
            session_timeout_minutes: row.session_timeout_minutes,
        }))
    }

    async fn insert_session(
        &self,
        session: PrequalificationSession,
    ) -> Result<PrequalificationSession> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            INSERT INTO prequal_sessions (
                id, workspace_id, vacancy_id, status, source, consent_given_at, expires_at,
                user_agent, ip_address, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session.id)
        .bind(&session.workspace_id)
        .bind(session.vacancy_id)
        .bind(session.status.as_str())
        .bind(session.source.as_str())
        .bind(session.consent_given_at)
        .bind(session.expires_at)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<PrequalificationSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM prequal_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PrequalificationSession::try_from).transpose()
    }

    async fn update_session(
        &self,
        session_id: Uuid,
        expected: Option<SessionStatus>,
        patch: SessionPatch,
    ) -> Result<Option<PrequalificationSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            UPDATE prequal_sessions SET
                status = COALESCE($3, status),
                parsed_resume = COALESCE(parsed_resume, $4),
                conversation_id = COALESCE(conversation_id, $5),
                fit_score = COALESCE(fit_score, $6),
                fit_decision = COALESCE(fit_decision, $7),
                evaluation = COALESCE(evaluation, $8),
                candidate_feedback = COALESCE(candidate_feedback, $9),
                updated_at = NOW()
            WHERE id = $1 AND ($2::TEXT IS NULL OR status = $2)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(expected.map(|s| s.as_str()))
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.parsed_resume.map(Json))
        .bind(patch.conversation_id)
        .bind(patch.fit_score)
        .bind(patch.fit_decision.map(|d| d.as_str()))
        .bind(patch.evaluation.map(Json))
        .bind(patch.candidate_feedback)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PrequalificationSession::try_from).transpose()
    }

    async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE prequal_sessions
            SET status = 'expired', updated_at = NOW()
            WHERE expires_at <= $1 AND status NOT IN ('submitted', 'expired')
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_conversation(&self, session_id: Uuid) -> Result<Conversation> {
        let (id, session_id, created_at): (Uuid, Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO conversations (id, session_id)
            VALUES ($1, $2)
            RETURNING id, session_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Conversation {
            id,
            session_id,
            created_at,
        })
    }

    async fn insert_message(&self, message: CreateMessage) -> Result<DialogueMessage> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO dialogue_messages (id, conversation_id, role, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, role, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<DialogueMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM dialogue_messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DialogueMessage::try_from).collect()
    }

    async fn submit_session(
        &self,
        session_id: Uuid,
        response: CandidateResponse,
    ) -> Result<Option<PrequalificationSession>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            UPDATE prequal_sessions
            SET status = 'submitted', response_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'completed' AND response_id IS NULL
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(response.id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO candidate_responses (
                id, workspace_id, vacancy_id, session_id, candidate_name, candidate_email,
                candidate_phone, cover_letter, fit_score, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(response.id)
        .bind(&response.workspace_id)
        .bind(response.vacancy_id)
        .bind(response.session_id)
        .bind(&response.candidate_name)
        .bind(&response.candidate_email)
        .bind(&response.candidate_phone)
        .bind(&response.cover_letter)
        .bind(response.fit_score)
        .bind(response.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row.try_into()?))
    }

    async fn insert_audit_log(&self, entry: CreateAuditLog) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            INSERT INTO tenant_audit_logs (
                id, workspace_id, caller_id, operation, resource_id, success,
                failure_reason, ip_address, user_agent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, workspace_id, caller_id, operation, resource_id, success,
                      failure_reason, ip_address, user_agent, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.workspace_id)
        .bind(&entry.caller_id)
        .bind(&entry.operation)
        .bind(&entry.resource_id)
        .bind(entry.success)
        .bind(&entry.failure_reason)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(AuditLog {
            id: row.id,
            workspace_id: row.workspace_id,
            caller_id: row.caller_id,
            operation: row.operation,
            resource_id: row.resource_id,
            success: row.success,
            failure_reason: row.failure_reason,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}
