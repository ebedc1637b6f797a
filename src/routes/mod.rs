pub mod health;
pub mod public;
pub mod recruiter;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_bearer_auth, JwtAuth},
    cors::public_cors,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

const SESSION_PATH: &str = "/api/public/workspaces/:workspace_id/sessions/:session_id";

pub fn build_router(state: AppState, public_rps: u32, jwt_secret: &str) -> Router {
    let public_api = Router::new()
        .route(
            "/api/public/workspaces/:workspace_id/sessions",
            post(public::create_session),
        )
        .route(SESSION_PATH, get(public::get_session))
        .route(&format!("{SESSION_PATH}/resume"), post(public::upload_resume))
        .route(
            &format!("{SESSION_PATH}/messages"),
            get(public::list_messages).post(public::send_message),
        )
        .route(&format!("{SESSION_PATH}/evaluate"), post(public::evaluate_session))
        .route(&format!("{SESSION_PATH}/result"), get(public::get_result))
        .route(&format!("{SESSION_PATH}/submit"), post(public::submit_application))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(public_rps),
            rps_middleware,
        ))
        .layer(public_cors());

    let recruiter_api = Router::new()
        .route(
            "/api/workspaces/:workspace_id/sessions/:session_id/report",
            get(recruiter::get_report),
        )
        .layer(axum::middleware::from_fn_with_state(
            JwtAuth::new(jwt_secret),
            require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(public_api)
        .merge(recruiter_api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
}
