use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    response::Json,
};
use uuid::Uuid;

use crate::middleware::auth::Claims;
use crate::routes::public::{client_ip, user_agent};
use crate::services::prequal_service::RecruiterReport;
use crate::services::tenant_guard::AccessContext;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> crate::error::Result<Json<RecruiterReport>> {
    let ctx = AccessContext::caller(claims.sub)
        .with_client(client_ip(&headers), user_agent(&headers));
    let report = state
        .prequal
        .get_recruiter_report(session_id, &workspace_id, &ctx)
        .await?;
    Ok(Json(report))
}
