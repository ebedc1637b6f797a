use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::prequal_dto::{
    CreateSessionBody, DialogueTurnResponse, MessageResponse, SendMessageBody, SessionResponse,
    SubmitApplicationBody, SubmitApplicationResponse, UploadResumeBody,
};
use crate::models::session::SessionSource;
use crate::services::session_manager::CreateSessionRequest;
use crate::services::tenant_guard::AccessContext;
use crate::AppState;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .or_else(|| header_value(headers, "x-real-ip"))
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    header_value(headers, header::USER_AGENT.as_str())
}

fn anonymous(headers: &HeaderMap) -> AccessContext {
    AccessContext::anonymous().with_client(client_ip(headers), user_agent(headers))
}

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CreateSessionBody>,
) -> crate::error::Result<Response> {
    let session = state
        .prequal
        .create_session(CreateSessionRequest {
            workspace_id,
            vacancy_id: body.vacancy_id,
            candidate_consent: body.candidate_consent,
            source: body.source.unwrap_or(SessionSource::Widget),
            user_agent: user_agent(&headers),
            ip_address: client_ip(&headers),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))).into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> crate::error::Result<Json<SessionResponse>> {
    let session = state
        .prequal
        .get_session(session_id, &workspace_id, &anonymous(&headers))
        .await?;
    Ok(Json(SessionResponse::from(&session)))
}

#[axum::debug_handler]
pub async fn upload_resume(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<UploadResumeBody>,
) -> crate::error::Result<Json<DialogueTurnResponse>> {
    body.validate()?;
    let turn = state
        .prequal
        .upload_resume(
            session_id,
            &workspace_id,
            body.into_parsed_resume(),
            &anonymous(&headers),
        )
        .await?;
    Ok(Json(DialogueTurnResponse::from(turn)))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<SendMessageBody>,
) -> crate::error::Result<Json<DialogueTurnResponse>> {
    body.validate()?;
    let turn = state
        .prequal
        .send_message(session_id, &workspace_id, &body.content, &anonymous(&headers))
        .await?;
    Ok(Json(DialogueTurnResponse::from(turn)))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> crate::error::Result<Json<Vec<MessageResponse>>> {
    let messages = state
        .prequal
        .list_messages(session_id, &workspace_id, &anonymous(&headers))
        .await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

#[axum::debug_handler]
pub async fn evaluate_session(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> crate::error::Result<Json<SessionResponse>> {
    let session = state
        .prequal
        .evaluate_session(session_id, &workspace_id, &anonymous(&headers))
        .await?;
    Ok(Json(SessionResponse::from(&session)))
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> crate::error::Result<Response> {
    let result = state
        .prequal
        .get_candidate_result(session_id, &workspace_id, &anonymous(&headers))
        .await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<SubmitApplicationBody>,
) -> crate::error::Result<Response> {
    body.validate()?;
    let (session, response) = state
        .prequal
        .submit_application(session_id, &workspace_id, body.into(), &anonymous(&headers))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            session: SessionResponse::from(&session),
            response_id: response.id,
        }),
    )
        .into_response())
}
