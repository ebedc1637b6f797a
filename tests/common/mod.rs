#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use prequal_backend::models::prequal_config::{PrequalConfig, StoredPrequalConfig};
use prequal_backend::models::resume::{ParsedResume, ResumeStructure};
use prequal_backend::models::session::{PrequalificationSession, SessionSource, SessionStatus};
use prequal_backend::models::vacancy::Vacancy;
use prequal_backend::models::workspace::MemberRole;
use prequal_backend::repository::{InMemoryStore, PrequalStore};
use prequal_backend::services::ai_service::{CompletionClient, CompletionError};
use prequal_backend::services::prequal_service::PrequalificationService;
use prequal_backend::services::session_manager::CreateSessionRequest;

pub const QUESTION: &str = "Which project are you most proud of and why?";
pub const FEEDBACK: &str = "Thank you for your time. Your experience building Rust services lines up well with what the team needs.";
pub const EVALUATION: &str = r#"Here is the evaluation:
{"fitScore": 68,
 "dimensions": {
   "hardSkills": {"score": 72, "confidence": 0.8, "notes": "Rust"},
   "softSkills": {"score": 65, "confidence": 0.6, "notes": "Clear"},
   "cultureFit": {"score": 66, "confidence": 0.5, "notes": "Fine"},
   "salaryAlignment": {"score": 60, "confidence": 0.2, "notes": "Unknown"}},
 "strengths": ["Rust services"], "risks": ["Limited leadership"],
 "recommendation": "Second interview", "summary": "Solid engineer"}"#;

/// Answers by prompt kind and counts the calls it served.
#[derive(Default)]
pub struct ScriptedCompletion {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("Respond with a single JSON object") {
            Ok(EVALUATION.to_string())
        } else if prompt.contains("Write short feedback") {
            Ok(format!("\"{}\"", FEEDBACK))
        } else {
            Ok(QUESTION.to_string())
        }
    }
}

pub struct World {
    pub store: Arc<InMemoryStore>,
    pub completion: Arc<ScriptedCompletion>,
    pub service: PrequalificationService,
    pub acme_vacancy: Uuid,
    pub globex_vacancy: Uuid,
}

fn vacancy(workspace_id: &str, title: &str) -> Vacancy {
    Vacancy {
        id: Uuid::new_v4(),
        workspace_id: workspace_id.into(),
        title: title.into(),
        description: Some("Design and run backend services".into()),
        requirements: Some("Rust, PostgreSQL".into()),
        salary_from: Some(4000),
        salary_to: Some(6000),
        currency: Some("EUR".into()),
        created_at: None,
    }
}

/// Two tenants, one vacancy each, a recruiter in `acme` and a short
/// three-turn dialogue policy there.
pub fn world() -> World {
    let store = Arc::new(InMemoryStore::new());
    store.add_workspace("acme", "Acme").unwrap();
    store.add_workspace("globex", "Globex").unwrap();
    store.add_member("acme", "recruiter-1", MemberRole::Owner).unwrap();
    store.add_member("globex", "recruiter-2", MemberRole::Admin).unwrap();

    let acme = vacancy("acme", "Backend Engineer");
    let globex = vacancy("globex", "Data Engineer");
    let (acme_vacancy, globex_vacancy) = (acme.id, globex.id);
    store.add_vacancy(acme).unwrap();
    store.add_vacancy(globex).unwrap();
    store
        .set_prequal_config(StoredPrequalConfig {
            workspace_id: "acme".into(),
            max_dialogue_turns: Some(3),
            ..Default::default()
        })
        .unwrap();

    let completion = Arc::new(ScriptedCompletion::default());
    let service = PrequalificationService::new(
        store.clone(),
        completion.clone(),
        PrequalConfig::default(),
    );
    World {
        store,
        completion,
        service,
        acme_vacancy,
        globex_vacancy,
    }
}

pub fn create_request(workspace_id: &str, vacancy_id: Uuid, consent: bool) -> CreateSessionRequest {
    CreateSessionRequest {
        workspace_id: workspace_id.into(),
        vacancy_id,
        candidate_consent: consent,
        source: SessionSource::Widget,
        user_agent: Some("integration-test".into()),
        ip_address: Some("203.0.113.7".into()),
    }
}

pub fn resume() -> ParsedResume {
    ParsedResume {
        raw_text: "Senior Rust engineer, six years of backend work".into(),
        structured: Some(ResumeStructure {
            skills: vec!["Rust".into(), "PostgreSQL".into()],
            summary: Some("Backend engineer focused on reliability".into()),
            ..Default::default()
        }),
        confidence: 0.85,
    }
}

/// Inserts a session straight into the store, bypassing the manager.
pub async fn seed_session(
    store: &InMemoryStore,
    workspace_id: &str,
    vacancy_id: Uuid,
    status: SessionStatus,
    consent: bool,
    expires_in: Duration,
) -> PrequalificationSession {
    let now = Utc::now();
    store
        .insert_session(PrequalificationSession {
            id: Uuid::new_v4(),
            workspace_id: workspace_id.into(),
            vacancy_id,
            status,
            source: SessionSource::Direct,
            consent_given_at: consent.then_some(now),
            expires_at: now + expires_in,
            parsed_resume: None,
            conversation_id: None,
            fit_score: None,
            fit_decision: None,
            evaluation: None,
            candidate_feedback: None,
            response_id: None,
            user_agent: None,
            ip_address: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}
