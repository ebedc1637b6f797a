use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application submitted at the end of a completed prequalification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub id: Uuid,
    pub workspace_id: String,
    pub vacancy_id: Uuid,
    pub session_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: Option<String>,
    pub candidate_phone: Option<String>,
    pub cover_letter: Option<String>,
    pub fit_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}
