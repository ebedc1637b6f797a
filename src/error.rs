use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::session::SessionStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Candidate consent is required to start prequalification")]
    ConsentRequired,

    #[error("Vacancy not found: {0}")]
    VacancyNotFound(String),

    #[error("Resource belongs to a different workspace")]
    TenantMismatch,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Insufficient data for evaluation: {0}")]
    InsufficientData(String),

    #[error("AI service error: {0}")]
    AiService(String),

    #[error("Invalid evaluation result: {0}")]
    InvalidEvaluationResult(String),

    #[error("Feedback generation failed: {0}")]
    FeedbackGenerationFailed(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Invalid workspace id")]
    InvalidWorkspaceId,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable reason code carried alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::ConsentRequired => "CONSENT_REQUIRED",
            Error::VacancyNotFound(_) => "VACANCY_NOT_FOUND",
            Error::TenantMismatch => "TENANT_MISMATCH",
            Error::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Error::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Error::InsufficientData(_) => "INSUFFICIENT_DATA",
            Error::AiService(_) => "AI_SERVICE_ERROR",
            Error::InvalidEvaluationResult(_) => "INVALID_EVALUATION_RESULT",
            Error::FeedbackGenerationFailed(_) => "FEEDBACK_GENERATION_FAILED",
            Error::AccessDenied => "ACCESS_DENIED",
            Error::WorkspaceNotFound(_) => "WORKSPACE_NOT_FOUND",
            Error::InvalidWorkspaceId => "INVALID_WORKSPACE_ID",
            Error::Config(_) => "CONFIG_ERROR",
            Error::BadRequest(_) | Error::Json(_) => "BAD_REQUEST",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Database(_) | Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::ConsentRequired | Error::InsufficientData(_) | Error::InvalidWorkspaceId => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Error::AccessDenied => (StatusCode::FORBIDDEN, self.to_string()),
            Error::VacancyNotFound(_) | Error::WorkspaceNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            // Wrong-tenant lookups render exactly like a missing session.
            Error::SessionNotFound(_) | Error::TenantMismatch => {
                (StatusCode::NOT_FOUND, "Session not found".to_string())
            }
            Error::InvalidStateTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            Error::AiService(_) => (
                StatusCode::BAD_GATEWAY,
                "AI service is temporarily unavailable, please retry later".to_string(),
            ),
            Error::InvalidEvaluationResult(_) => (
                StatusCode::BAD_GATEWAY,
                "Evaluation could not be completed, please retry later".to_string(),
            ),
            Error::FeedbackGenerationFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "Feedback could not be generated, please retry later".to_string(),
            ),
            Error::Database(err) => {
                tracing::error!(error = ?err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": self.code(), "message": message }));
        (status, body).into_response()
    }
}
