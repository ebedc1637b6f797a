use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::evaluation::FitDecision;
use crate::models::message::{DialogueMessage, MessageRole};
use crate::models::resume::{ParsedResume, ResumeStructure};
use crate::models::session::{PrequalificationSession, SessionSource, SessionStatus};
use crate::services::prequal_service::DialogueTurn;
use crate::services::session_manager::ApplicationContact;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub vacancy_id: Uuid,
    #[serde(default)]
    pub candidate_consent: bool,
    pub source: Option<SessionSource>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadResumeBody {
    #[validate(length(min = 1, max = 200000))]
    pub raw_text: String,
    pub structured: Option<ResumeStructure>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub confidence: f64,
}

impl UploadResumeBody {
    pub fn into_parsed_resume(self) -> ParsedResume {
        ParsedResume {
            raw_text: self.raw_text,
            structured: self.structured,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageBody {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationBody {
    #[validate(length(min = 1, max = 200))]
    pub candidate_name: String,
    #[validate(email)]
    pub candidate_email: Option<String>,
    #[validate(length(max = 50))]
    pub candidate_phone: Option<String>,
    #[validate(length(max = 5000))]
    pub cover_letter: Option<String>,
}

impl From<SubmitApplicationBody> for ApplicationContact {
    fn from(body: SubmitApplicationBody) -> Self {
        Self {
            candidate_name: body.candidate_name.trim().to_string(),
            candidate_email: body.candidate_email,
            candidate_phone: body.candidate_phone,
            cover_letter: body.cover_letter,
        }
    }
}

/// Candidate-facing session view; scores are left out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub workspace_id: String,
    pub vacancy_id: Uuid,
    pub status: SessionStatus,
    pub source: SessionSource,
    pub consent_given_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub has_resume: bool,
    pub conversation_id: Option<Uuid>,
    pub fit_decision: Option<FitDecision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PrequalificationSession> for SessionResponse {
    fn from(s: &PrequalificationSession) -> Self {
        Self {
            id: s.id,
            workspace_id: s.workspace_id.clone(),
            vacancy_id: s.vacancy_id,
            status: s.status,
            source: s.source,
            consent_given_at: s.consent_given_at,
            expires_at: s.expires_at,
            has_resume: s.parsed_resume.is_some(),
            conversation_id: s.conversation_id,
            fit_decision: s.fit_decision,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<DialogueMessage> for MessageResponse {
    fn from(m: DialogueMessage) -> Self {
        Self {
            id: m.id,
            role: m.role,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueTurnResponse {
    pub session: SessionResponse,
    pub reply: Option<MessageResponse>,
    pub dialogue_complete: bool,
}

impl From<DialogueTurn> for DialogueTurnResponse {
    fn from(turn: DialogueTurn) -> Self {
        Self {
            session: SessionResponse::from(&turn.session),
            reply: turn.reply.map(MessageResponse::from),
            dialogue_complete: turn.dialogue_complete,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationResponse {
    pub session: SessionResponse,
    pub response_id: Uuid,
}
