use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::evaluation::{EvaluationResult, FitDecision};
use crate::models::resume::ParsedResume;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    ConsentPending,
    ResumePending,
    DialogueActive,
    Evaluating,
    Completed,
    Submitted,
    Expired,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 7] = [
        SessionStatus::ConsentPending,
        SessionStatus::ResumePending,
        SessionStatus::DialogueActive,
        SessionStatus::Evaluating,
        SessionStatus::Completed,
        SessionStatus::Submitted,
        SessionStatus::Expired,
    ];

    /// Targets reachable in one step from this status.
    pub fn allowed_transitions(&self) -> &'static [SessionStatus] {
        use SessionStatus::*;
        match self {
            ConsentPending => &[ResumePending, Expired],
            ResumePending => &[DialogueActive, Expired],
            DialogueActive => &[Evaluating, Expired],
            Evaluating => &[Completed, Expired],
            Completed => &[Submitted, Expired],
            Submitted | Expired => &[],
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::ConsentPending => "consent_pending",
            SessionStatus::ResumePending => "resume_pending",
            SessionStatus::DialogueActive => "dialogue_active",
            SessionStatus::Evaluating => "evaluating",
            SessionStatus::Completed => "completed",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown session status: {}", s))
    }
}

/// Where the candidate entered the prequalification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Widget,
    Telegram,
    Direct,
}

impl SessionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSource::Widget => "widget",
            SessionSource::Telegram => "telegram",
            SessionSource::Direct => "direct",
        }
    }
}

impl FromStr for SessionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "widget" => Ok(SessionSource::Widget),
            "telegram" => Ok(SessionSource::Telegram),
            "direct" => Ok(SessionSource::Direct),
            other => Err(format!("unknown session source: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrequalificationSession {
    pub id: Uuid,
    pub workspace_id: String,
    pub vacancy_id: Uuid,
    pub status: SessionStatus,
    pub source: SessionSource,
    pub consent_given_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub parsed_resume: Option<ParsedResume>,
    pub conversation_id: Option<Uuid>,
    pub fit_score: Option<i32>,
    pub fit_decision: Option<FitDecision>,
    pub evaluation: Option<EvaluationResult>,
    pub candidate_feedback: Option<String>,
    pub response_id: Option<Uuid>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrequalificationSession {
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Field changes applied by one conditional session write.
///
/// Payload fields only fill empty columns; a value already stored is kept.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub parsed_resume: Option<ParsedResume>,
    pub conversation_id: Option<Uuid>,
    pub fit_score: Option<i32>,
    pub fit_decision: Option<FitDecision>,
    pub evaluation: Option<EvaluationResult>,
    pub candidate_feedback: Option<String>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Applies the patch in place with fill-once semantics.
    pub fn apply_to(&self, session: &mut PrequalificationSession, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            session.status = status;
        }
        fill(&mut session.parsed_resume, &self.parsed_resume);
        fill(&mut session.conversation_id, &self.conversation_id);
        fill(&mut session.fit_score, &self.fit_score);
        fill(&mut session.fit_decision, &self.fit_decision);
        fill(&mut session.evaluation, &self.evaluation);
        fill(&mut session.candidate_feedback, &self.candidate_feedback);
        session.updated_at = now;
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL_PATH: [SessionStatus; 6] = [
        SessionStatus::ConsentPending,
        SessionStatus::ResumePending,
        SessionStatus::DialogueActive,
        SessionStatus::Evaluating,
        SessionStatus::Completed,
        SessionStatus::Submitted,
    ];

    #[test]
    fn terminal_states_accept_nothing() {
        for target in SessionStatus::ALL {
            assert!(!SessionStatus::Submitted.can_transition_to(target));
            assert!(!SessionStatus::Expired.can_transition_to(target));
        }
        assert!(SessionStatus::Submitted.is_terminal());
        assert!(SessionStatus::Expired.is_terminal());
    }

    #[test]
    fn every_live_state_can_expire() {
        for status in SessionStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(SessionStatus::Expired), "{status}");
        }
    }

    #[test]
    fn canonical_path_never_moves_backwards() {
        for (later_idx, later) in CANONICAL_PATH.iter().enumerate() {
            for earlier in &CANONICAL_PATH[..=later_idx] {
                assert!(
                    !later.can_transition_to(*earlier),
                    "{later} -> {earlier} must be rejected"
                );
            }
        }
    }

    #[test]
    fn canonical_path_advances_one_step_at_a_time() {
        for pair in CANONICAL_PATH.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
        assert!(!SessionStatus::ConsentPending.can_transition_to(SessionStatus::DialogueActive));
        assert!(!SessionStatus::ResumePending.can_transition_to(SessionStatus::Completed));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in SessionStatus::ALL {
            assert_eq!(status.as_str().parse::<SessionStatus>(), Ok(status));
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }
}
