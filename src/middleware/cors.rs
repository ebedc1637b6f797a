use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The candidate widget is embedded on arbitrary career sites.
pub fn public_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any)
}
