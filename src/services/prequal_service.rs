use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::evaluation::{EvaluationResult, FitDecision};
use crate::models::message::{DialogueMessage, MessageRole};
use crate::models::prequal_config::{PrequalConfig, Tone};
use crate::models::response::CandidateResponse;
use crate::models::resume::ParsedResume;
use crate::models::session::{PrequalificationSession, SessionStatus};
use crate::repository::PrequalStore;
use crate::services::ai_service::CompletionClient;
use crate::services::audit_service::AuditService;
use crate::services::dialogue_handler::{
    candidate_turns, check_mandatory_questions, is_dialogue_complete, DialogueContext,
    DialogueHandler, MandatoryCoverage,
};
use crate::services::evaluator_service::{transcript, EvaluatorService};
use crate::services::feedback_service::{
    normalize_feedback, FeedbackGeneratorService, FeedbackOptions,
};
use crate::services::session_manager::{ApplicationContact, CreateSessionRequest, SessionManager};
use crate::services::tenant_guard::{AccessContext, TenantGuard, VerifiedAccess};

const GENERIC_FOLLOW_UP: &str =
    "Could you tell me about a recent project you are proud of and the part you played in it?";

/// Outcome of a step that may add an interviewer turn.
#[derive(Debug, Clone)]
pub struct DialogueTurn {
    pub session: PrequalificationSession,
    pub reply: Option<DialogueMessage>,
    pub dialogue_complete: bool,
}

/// What the candidate may see: never numeric scores.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub fit_decision: Option<FitDecision>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruiterReport {
    pub session_id: Uuid,
    pub vacancy_id: Uuid,
    pub vacancy_title: String,
    pub status: SessionStatus,
    pub fit_score: Option<i32>,
    pub fit_decision: Option<FitDecision>,
    pub evaluation: Option<EvaluationResult>,
    pub candidate_feedback: Option<String>,
    pub response_id: Option<Uuid>,
    pub messages: Vec<DialogueMessage>,
}

/// Entry point for every prequalification operation. Each call passes the
/// tenant guard before touching session data.
#[derive(Clone)]
pub struct PrequalificationService {
    guard: TenantGuard,
    sessions: SessionManager,
    dialogue: DialogueHandler,
    evaluator: EvaluatorService,
    feedback: FeedbackGeneratorService,
    completion: Arc<dyn CompletionClient>,
}

impl PrequalificationService {
    pub fn new(
        store: Arc<dyn PrequalStore>,
        completion: Arc<dyn CompletionClient>,
        defaults: PrequalConfig,
    ) -> Self {
        let guard = TenantGuard::new(store.clone(), AuditService::new(store.clone()));
        let sessions = SessionManager::new(store.clone(), guard.clone(), defaults);
        let dialogue = DialogueHandler::new(store, sessions.clone());
        Self {
            guard,
            sessions,
            dialogue,
            evaluator: EvaluatorService::new(completion.clone()),
            feedback: FeedbackGeneratorService::new(completion.clone()),
            completion,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    async fn authorize(
        &self,
        workspace_id: &str,
        operation: &str,
        session_id: Uuid,
        ctx: &AccessContext,
    ) -> Result<VerifiedAccess> {
        let ctx = ctx.clone().with_resource(session_id);
        self.guard.verify_access(workspace_id, operation, &ctx).await
    }

    pub async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<PrequalificationSession> {
        let ctx = AccessContext::anonymous()
            .with_resource(req.vacancy_id)
            .with_client(req.ip_address.clone(), req.user_agent.clone());
        self.guard
            .verify_access(&req.workspace_id, "session.create", &ctx)
            .await?;
        self.sessions.create_session(req).await
    }

    pub async fn get_session(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        ctx: &AccessContext,
    ) -> Result<PrequalificationSession> {
        self.authorize(workspace_id, "session.get", session_id, ctx)
            .await?;
        self.sessions.get_session(session_id, workspace_id).await
    }

    /// Saves the parsed resume, opens the conversation and asks the first
    /// question.
    pub async fn upload_resume(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        parsed_resume: ParsedResume,
        ctx: &AccessContext,
    ) -> Result<DialogueTurn> {
        self.authorize(workspace_id, "session.resume", session_id, ctx)
            .await?;
        let session = self
            .sessions
            .save_resume_and_advance(session_id, workspace_id, parsed_resume)
            .await?;
        let (_, conversation_id) = self.dialogue.create_conversation(&session).await?;

        let config = self.sessions.resolve_config(workspace_id).await?;
        let context = self
            .dialogue
            .get_dialogue_context(session_id, workspace_id, &config)
            .await?;
        let coverage = check_mandatory_questions(&context.history, &config.mandatory_questions);
        let question = self.next_question(&context, &coverage).await;
        let reply = self
            .dialogue
            .save_message(conversation_id, MessageRole::Assistant, &question)
            .await?;

        Ok(DialogueTurn {
            session: context.session,
            reply: Some(reply),
            dialogue_complete: false,
        })
    }

    /// Records a candidate answer. Either asks the next question or, once
    /// the dialogue is complete, moves the session to `evaluating`.
    pub async fn send_message(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        content: &str,
        ctx: &AccessContext,
    ) -> Result<DialogueTurn> {
        self.authorize(workspace_id, "session.message", session_id, ctx)
            .await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::BadRequest("message content is empty".to_string()));
        }

        let session = self.sessions.get_session(session_id, workspace_id).await?;
        if session.status != SessionStatus::DialogueActive {
            return Err(Error::InvalidStateTransition {
                from: session.status,
                to: SessionStatus::DialogueActive,
            });
        }

        let config = self.sessions.resolve_config(workspace_id).await?;
        let (_, conversation_id) = self.dialogue.ensure_conversation(&session).await?;
        self.dialogue
            .save_message(conversation_id, MessageRole::User, content)
            .await?;

        let context = self
            .dialogue
            .get_dialogue_context(session_id, workspace_id, &config)
            .await?;

        if is_dialogue_complete(&context.history, &config) {
            let session = self
                .sessions
                .update_session_status(session_id, workspace_id, SessionStatus::Evaluating)
                .await?;
            tracing::info!(
                session_id = %session_id,
                candidate_turns = candidate_turns(&context.history),
                "Dialogue complete"
            );
            return Ok(DialogueTurn {
                session,
                reply: None,
                dialogue_complete: true,
            });
        }

        let coverage = check_mandatory_questions(&context.history, &config.mandatory_questions);
        let question = self.next_question(&context, &coverage).await;
        let reply = self
            .dialogue
            .save_message(conversation_id, MessageRole::Assistant, &question)
            .await?;

        Ok(DialogueTurn {
            session: context.session,
            reply: Some(reply),
            dialogue_complete: false,
        })
    }

    pub async fn list_messages(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        ctx: &AccessContext,
    ) -> Result<Vec<DialogueMessage>> {
        self.authorize(workspace_id, "session.messages", session_id, ctx)
            .await?;
        let session = self.sessions.get_session(session_id, workspace_id).await?;
        self.dialogue.history(&session).await
    }

    /// Scores an `evaluating` session and stores the outcome. On failure the
    /// session stays in `evaluating` so the call can be repeated.
    pub async fn evaluate_session(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        ctx: &AccessContext,
    ) -> Result<PrequalificationSession> {
        self.authorize(workspace_id, "session.evaluate", session_id, ctx)
            .await?;
        let config = self.sessions.resolve_config(workspace_id).await?;
        let context = self
            .dialogue
            .get_dialogue_context(session_id, workspace_id, &config)
            .await?;
        if context.session.status != SessionStatus::Evaluating {
            return Err(Error::InvalidStateTransition {
                from: context.session.status,
                to: SessionStatus::Completed,
            });
        }

        let outcome = self.score(&context).await;
        let (evaluation, feedback) = match outcome {
            Ok(scored) => scored,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    code = e.code(),
                    "Evaluation failed; session left in evaluating"
                );
                return Err(e);
            }
        };

        self.sessions
            .complete_evaluation(session_id, workspace_id, evaluation, feedback)
            .await
    }

    async fn score(&self, context: &DialogueContext) -> Result<(EvaluationResult, String)> {
        let evaluation = self
            .evaluator
            .evaluate(
                context.parsed_resume.as_ref(),
                &context.history,
                &context.vacancy,
                &context.config,
            )
            .await?;
        let options = FeedbackOptions {
            honesty_level: context.config.honesty_level,
            tone: context.config.tone,
            fit_decision: evaluation.fit_decision,
            fit_score: evaluation.fit_score,
            vacancy_title: context.vacancy.title.clone(),
        };
        let feedback = self.feedback.generate_feedback(&evaluation, &options).await?;
        Ok((evaluation, feedback))
    }

    pub async fn get_candidate_result(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        ctx: &AccessContext,
    ) -> Result<CandidateResult> {
        self.authorize(workspace_id, "session.result", session_id, ctx)
            .await?;
        let session = self.sessions.get_session(session_id, workspace_id).await?;
        Ok(CandidateResult {
            session_id: session.id,
            status: session.status,
            fit_decision: session.fit_decision,
            feedback: session.candidate_feedback,
        })
    }

    /// Full evaluation for a workspace member.
    pub async fn get_recruiter_report(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        ctx: &AccessContext,
    ) -> Result<RecruiterReport> {
        if ctx.caller_id.is_none() {
            return Err(Error::Unauthorized("caller identity required".to_string()));
        }
        self.authorize(workspace_id, "session.report", session_id, ctx)
            .await?;
        let session = self.sessions.get_session(session_id, workspace_id).await?;
        let vacancy = self
            .sessions
            .find_vacancy(session.vacancy_id, workspace_id)
            .await?;
        let messages = self.dialogue.history(&session).await?;

        Ok(RecruiterReport {
            session_id: session.id,
            vacancy_id: vacancy.id,
            vacancy_title: vacancy.title,
            status: session.status,
            fit_score: session.fit_score,
            fit_decision: session.fit_decision,
            evaluation: session.evaluation,
            candidate_feedback: session.candidate_feedback,
            response_id: session.response_id,
            messages,
        })
    }

    pub async fn submit_application(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        contact: ApplicationContact,
        ctx: &AccessContext,
    ) -> Result<(PrequalificationSession, CandidateResponse)> {
        self.authorize(workspace_id, "session.submit", session_id, ctx)
            .await?;
        self.sessions
            .submit_application(session_id, workspace_id, contact)
            .await
    }

    pub async fn expire_overdue_sessions(&self) -> Result<u64> {
        self.sessions.expire_overdue_sessions().await
    }

    /// Picks the next interviewer question. Missing mandatory questions are
    /// asked verbatim once the remaining turns no longer leave room for
    /// anything else, or when the model call fails.
    async fn next_question(&self, context: &DialogueContext, coverage: &MandatoryCoverage) -> String {
        let max_turns = context.config.max_dialogue_turns.max(0) as usize;
        let remaining = max_turns.saturating_sub(candidate_turns(&context.history));
        let fallback = coverage
            .missing
            .first()
            .cloned()
            .unwrap_or_else(|| GENERIC_FOLLOW_UP.to_string());

        if !coverage.missing.is_empty() && remaining <= coverage.missing.len() {
            return fallback;
        }

        let prompt = build_question_prompt(context, &coverage.missing);
        match self.completion.complete(&prompt).await {
            Ok(raw) => {
                let question = normalize_feedback(&raw);
                if !question.is_empty() {
                    return question;
                }
                tracing::warn!(
                    session_id = %context.session.id,
                    "Question generation returned nothing; using fallback"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %context.session.id,
                    error = %e,
                    "Question generation failed; using fallback"
                );
            }
        }
        fallback
    }
}

fn build_question_prompt(context: &DialogueContext, missing: &[String]) -> String {
    let register = match context.config.tone {
        Tone::Formal => "formal and professional",
        Tone::Friendly => "warm and conversational",
    };
    let resume = context
        .parsed_resume
        .as_ref()
        .map(|r| r.summary_text())
        .unwrap_or_default();
    let history = if context.history.is_empty() {
        "(no messages yet, this is the opening question)".to_string()
    } else {
        transcript(&context.history)
    };
    let must_ask = if missing.is_empty() {
        "(none)".to_string()
    } else {
        missing
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are interviewing a candidate for the role "{title}" in a short written prequalification chat. Keep a {register} tone.

Role description:
{description}

Candidate resume:
{resume}

Conversation so far:
{history}

Questions that still must be asked:
{must_ask}

Ask exactly one next question. Prefer one of the questions that still must be asked, otherwise dig into the candidate's experience relevant to the role. Do not repeat a question already asked. Output only the question text."#,
        title = context.vacancy.title.trim(),
        register = register,
        description = context.vacancy.description.as_deref().unwrap_or("(not provided)"),
        resume = resume,
        history = history,
        must_ask = must_ask,
    )
}
