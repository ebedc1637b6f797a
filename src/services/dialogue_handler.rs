use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::message::{CreateMessage, DialogueMessage, MessageRole};
use crate::models::prequal_config::PrequalConfig;
use crate::models::resume::ParsedResume;
use crate::models::session::PrequalificationSession;
use crate::models::vacancy::Vacancy;
use crate::repository::PrequalStore;
use crate::services::session_manager::SessionManager;

/// Candidate turns below which a dialogue is never sufficient.
pub const MIN_EXCHANGES: usize = 3;
/// Share of a question's keywords a turn must contain to count as asking it.
pub const KEYWORD_MATCH_RATIO: f64 = 0.6;
/// Words an answer needs to count as substantive.
pub const SUBSTANTIVE_ANSWER_WORDS: usize = 8;
/// Total candidate words needed before the turn cap is reached.
pub const MIN_CANDIDATE_WORDS: usize = 60;

const MIN_KEYWORD_LEN: usize = 4;

// Function words long enough to pass the length filter but carrying no topic.
const STOPWORDS: &[&str] = &[
    "about", "also", "been", "being", "could", "describe", "does", "each", "from", "have",
    "here", "into", "just", "many", "more", "most", "much", "please", "should", "some", "tell",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those", "very",
    "were", "what", "when", "where", "which", "whom", "whose", "will", "with", "would", "your",
    "yours",
];

#[derive(Debug, Clone)]
pub struct DialogueContext {
    pub session: PrequalificationSession,
    pub vacancy: Vacancy,
    pub parsed_resume: Option<ParsedResume>,
    pub history: Vec<DialogueMessage>,
    pub config: PrequalConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MandatoryCoverage {
    pub asked: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Clone)]
pub struct DialogueHandler {
    store: Arc<dyn PrequalStore>,
    sessions: SessionManager,
}

impl DialogueHandler {
    pub fn new(store: Arc<dyn PrequalStore>, sessions: SessionManager) -> Self {
        Self { store, sessions }
    }

    pub async fn get_dialogue_context(
        &self,
        session_id: Uuid,
        workspace_id: &str,
        config: &PrequalConfig,
    ) -> Result<DialogueContext> {
        let session = self.sessions.get_session(session_id, workspace_id).await?;
        let vacancy = self
            .sessions
            .find_vacancy(session.vacancy_id, workspace_id)
            .await?;
        let history = self.history(&session).await?;

        Ok(DialogueContext {
            parsed_resume: session.parsed_resume.clone(),
            session,
            vacancy,
            history,
            config: config.clone(),
        })
    }

    pub async fn history(&self, session: &PrequalificationSession) -> Result<Vec<DialogueMessage>> {
        match session.conversation_id {
            Some(conversation_id) => self.store.list_messages(conversation_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Creates a conversation and links it onto the session. When another
    /// request linked one first, that conversation is returned instead.
    pub async fn create_conversation(
        &self,
        session: &PrequalificationSession,
    ) -> Result<(PrequalificationSession, Uuid)> {
        let conversation = self.store.insert_conversation(session.id).await?;
        let linked = self
            .sessions
            .link_conversation(session, conversation.id)
            .await?;
        let conversation_id = linked.conversation_id.unwrap_or(conversation.id);
        if conversation_id != conversation.id {
            tracing::debug!(
                session_id = %session.id,
                orphaned = %conversation.id,
                "Conversation already linked by a concurrent request"
            );
        }
        Ok((linked, conversation_id))
    }

    pub async fn ensure_conversation(
        &self,
        session: &PrequalificationSession,
    ) -> Result<(PrequalificationSession, Uuid)> {
        match session.conversation_id {
            Some(conversation_id) => Ok((session.clone(), conversation_id)),
            None => self.create_conversation(session).await,
        }
    }

    pub async fn save_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<DialogueMessage> {
        self.store
            .insert_message(CreateMessage {
                conversation_id,
                role,
                content: content.trim().to_string(),
            })
            .await
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

fn question_keywords(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = words(question)
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect();
    keywords.sort();
    keywords.dedup();
    keywords
}

fn turn_asks(turn: &str, question: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return turn
            .to_lowercase()
            .contains(question.trim().to_lowercase().as_str());
    }
    let turn_words: HashSet<String> = words(turn).collect();
    let hits = keywords.iter().filter(|k| turn_words.contains(*k)).count();
    hits as f64 / keywords.len() as f64 >= KEYWORD_MATCH_RATIO
}

/// Splits configured mandatory questions into asked and missing, judging
/// assistant turns by keyword overlap rather than exact wording.
pub fn check_mandatory_questions(
    history: &[DialogueMessage],
    mandatory_questions: &[String],
) -> MandatoryCoverage {
    let assistant_turns: Vec<&str> = history
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .map(|m| m.content.as_str())
        .collect();

    let mut coverage = MandatoryCoverage::default();
    for question in mandatory_questions {
        let keywords = question_keywords(question);
        if assistant_turns
            .iter()
            .any(|turn| turn_asks(turn, question, &keywords))
        {
            coverage.asked.push(question.clone());
        } else {
            coverage.missing.push(question.clone());
        }
    }
    coverage
}

pub fn candidate_turns(history: &[DialogueMessage]) -> usize {
    history.iter().filter(|m| m.role == MessageRole::User).count()
}

pub fn is_dialogue_sufficient(history: &[DialogueMessage], config: &PrequalConfig) -> bool {
    let answers: Vec<usize> = history
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| words(&m.content).count())
        .collect();

    if answers.len() < MIN_EXCHANGES {
        return false;
    }
    if answers.len() >= config.max_dialogue_turns.max(0) as usize {
        return true;
    }

    let substantive = answers
        .iter()
        .filter(|&&count| count >= SUBSTANTIVE_ANSWER_WORDS)
        .count();
    let total: usize = answers.iter().sum();
    substantive >= MIN_EXCHANGES && total >= MIN_CANDIDATE_WORDS
}

/// Ready for evaluation: enough signal and every mandatory question asked.
pub fn is_dialogue_complete(history: &[DialogueMessage], config: &PrequalConfig) -> bool {
    is_dialogue_sufficient(history, config)
        && check_mandatory_questions(history, &config.mandatory_questions)
            .missing
            .is_empty()
}
