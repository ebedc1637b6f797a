mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use common::{world, FEEDBACK, QUESTION};
use prequal_backend::middleware::auth::Claims;
use prequal_backend::models::prequal_config::PrequalConfig;
use prequal_backend::{routes, AppState};

const JWT_SECRET: &str = "test_secret_key";

fn app(w: &common::World) -> Router {
    let state = AppState::with_components(
        w.store.clone(),
        w.completion.clone(),
        PrequalConfig::default(),
    );
    routes::build_router(state, 1000, JWT_SECRET)
}

fn token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("sign token")
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let res = app.clone().oneshot(req).await.expect("router response");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn post(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let w = world();
    let (status, body) = call(&app(&w), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn public_flow_end_to_end() {
    let w = world();
    let app = app(&w);
    let base = "/api/public/workspaces/acme/sessions";

    let (status, body) = call(
        &app,
        post(base, json!({"vacancyId": w.acme_vacancy, "candidateConsent": false})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CONSENT_REQUIRED");

    let (status, session) = call(
        &app,
        post(base, json!({"vacancyId": w.acme_vacancy, "candidateConsent": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["status"], "resume_pending");
    assert_eq!(session["source"], "widget");
    let id = session["id"].as_str().unwrap().to_string();
    let session_url = format!("{base}/{id}");

    let (status, turn) = call(
        &app,
        post(
            &format!("{session_url}/resume"),
            json!({
                "rawText": "Senior Rust engineer",
                "structured": {"skills": ["Rust", "PostgreSQL"]},
                "confidence": 0.9
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["session"]["status"], "dialogue_active");
    assert_eq!(turn["session"]["hasResume"], true);
    assert_eq!(turn["reply"]["role"], "assistant");
    assert_eq!(turn["reply"]["content"], QUESTION);

    let answers = [
        "I rebuilt our billing pipeline in Rust last year",
        "The hardest part was migrating data without downtime",
        "I would love to work on payments again",
    ];
    let mut last = JsonValue::Null;
    for answer in answers {
        let (status, turn) = call(
            &app,
            post(&format!("{session_url}/messages"), json!({"content": answer})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = turn;
    }
    assert_eq!(last["dialogueComplete"], true);
    assert!(last["reply"].is_null());
    assert_eq!(last["session"]["status"], "evaluating");

    let (status, messages) = call(&app, get(&format!("{session_url}/messages"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 6);

    let (status, evaluated) = call(&app, post(&format!("{session_url}/evaluate"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(evaluated["status"], "completed");
    assert_eq!(evaluated["fitDecision"], "potential_fit");
    assert!(evaluated.get("fitScore").is_none());

    let (status, result) = call(&app, get(&format!("{session_url}/result"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["feedback"], FEEDBACK);
    assert!(result.get("fitScore").is_none());

    let (status, submitted) = call(
        &app,
        post(
            &format!("{session_url}/submit"),
            json!({"candidateName": "Ada Lovelace", "candidateEmail": "ada@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submitted["session"]["status"], "submitted");
    assert!(submitted["responseId"].is_string());

    let (status, body) = call(
        &app,
        post(
            &format!("{session_url}/submit"),
            json!({"candidateName": "Ada Lovelace"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_STATE_TRANSITION");

    let report_url = format!("/api/workspaces/acme/sessions/{id}/report");
    let (status, _) = call(&app, get(&report_url)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri(&report_url)
        .header(header::AUTHORIZATION, format!("Bearer {}", token("recruiter-1")))
        .body(Body::empty())
        .unwrap();
    let (status, report) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["fitScore"], 68);
    assert_eq!(report["evaluation"]["dimensions"]["hardSkills"]["score"], 72);
    assert_eq!(report["messages"].as_array().unwrap().len(), 6);

    assert_eq!(w.store.responses().unwrap().len(), 1);
}

#[tokio::test]
async fn wrong_tenant_looks_like_a_missing_session() {
    let w = world();
    let app = app(&w);
    let (_, session) = call(
        &app,
        post(
            "/api/public/workspaces/acme/sessions",
            json!({"vacancyId": w.acme_vacancy, "candidateConsent": true}),
        ),
    )
    .await;
    let id = session["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        get(&format!("/api/public/workspaces/globex/sessions/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");

    let (status, body) = call(
        &app,
        get(&format!(
            "/api/public/workspaces/globex/sessions/{}",
            uuid::Uuid::new_v4()
        )),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");
}

#[tokio::test]
async fn invalid_bodies_are_rejected() {
    let w = world();
    let app = app(&w);
    let (_, session) = call(
        &app,
        post(
            "/api/public/workspaces/acme/sessions",
            json!({"vacancyId": w.acme_vacancy, "candidateConsent": true}),
        ),
    )
    .await;
    let id = session["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        post(
            &format!("/api/public/workspaces/acme/sessions/{id}/resume"),
            json!({"rawText": "", "confidence": 2.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = call(
        &app,
        post(
            &format!("/api/public/workspaces/acme/sessions/{id}/messages"),
            json!({"content": "Hello"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn public_routes_are_rate_limited() {
    let w = world();
    let state = AppState::with_components(
        w.store.clone(),
        Arc::new(common::ScriptedCompletion::default()),
        PrequalConfig::default(),
    );
    let app = routes::build_router(state, 1, JWT_SECRET);
    let url = format!("/api/public/workspaces/acme/sessions/{}", uuid::Uuid::new_v4());

    let (first, _) = call(&app, get(&url)).await;
    assert_eq!(first, StatusCode::NOT_FOUND);
    let (second, body) = call(&app, get(&url)).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "RATE_LIMITED");
}
