use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Friendly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HonestyLevel {
    Direct,
    Diplomatic,
    Encouraging,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Friendly => "friendly",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "formal" => Ok(Tone::Formal),
            "friendly" => Ok(Tone::Friendly),
            other => Err(format!("unknown tone: {}", other)),
        }
    }
}

impl HonestyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HonestyLevel::Direct => "direct",
            HonestyLevel::Diplomatic => "diplomatic",
            HonestyLevel::Encouraging => "encouraging",
        }
    }
}

impl fmt::Display for HonestyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HonestyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(HonestyLevel::Direct),
            "diplomatic" => Ok(HonestyLevel::Diplomatic),
            "encouraging" => Ok(HonestyLevel::Encouraging),
            other => Err(format!("unknown honesty level: {}", other)),
        }
    }
}

/// Workspace policy row as stored; any column may be unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredPrequalConfig {
    pub workspace_id: String,
    pub pass_threshold: Option<i32>,
    pub mandatory_questions: Option<Vec<String>>,
    pub tone: Option<Tone>,
    pub honesty_level: Option<HonestyLevel>,
    pub max_dialogue_turns: Option<i32>,
    pub session_timeout_minutes: Option<i32>,
}

/// Fully resolved per-workspace prequalification policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrequalConfig {
    pub pass_threshold: i32,
    pub mandatory_questions: Vec<String>,
    pub tone: Tone,
    pub honesty_level: HonestyLevel,
    pub max_dialogue_turns: i32,
    pub session_timeout_minutes: i32,
}

impl Default for PrequalConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 60,
            mandatory_questions: Vec::new(),
            tone: Tone::Friendly,
            honesty_level: HonestyLevel::Diplomatic,
            max_dialogue_turns: 10,
            session_timeout_minutes: 30,
        }
    }
}

/// Merges a possibly partial stored policy over `defaults`.
pub fn resolve_effective_config(
    stored: Option<&StoredPrequalConfig>,
    defaults: &PrequalConfig,
) -> PrequalConfig {
    let Some(stored) = stored else {
        return defaults.clone();
    };

    let mandatory_questions = stored
        .mandatory_questions
        .as_ref()
        .map(|questions| {
            questions
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect()
        })
        .unwrap_or_else(|| defaults.mandatory_questions.clone());

    PrequalConfig {
        pass_threshold: stored
            .pass_threshold
            .unwrap_or(defaults.pass_threshold)
            .clamp(0, 100),
        mandatory_questions,
        tone: stored.tone.unwrap_or(defaults.tone),
        honesty_level: stored.honesty_level.unwrap_or(defaults.honesty_level),
        max_dialogue_turns: stored
            .max_dialogue_turns
            .unwrap_or(defaults.max_dialogue_turns)
            .max(1),
        session_timeout_minutes: stored
            .session_timeout_minutes
            .unwrap_or(defaults.session_timeout_minutes)
            .max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_yields_defaults() {
        let defaults = PrequalConfig::default();
        assert_eq!(resolve_effective_config(None, &defaults), defaults);
    }

    #[test]
    fn stored_fields_override_and_unset_fields_fall_back() {
        let stored = StoredPrequalConfig {
            workspace_id: "ws-1".into(),
            pass_threshold: Some(70),
            tone: Some(Tone::Formal),
            mandatory_questions: Some(vec!["  Why this role?  ".into(), "   ".into()]),
            ..Default::default()
        };
        let resolved = resolve_effective_config(Some(&stored), &PrequalConfig::default());

        assert_eq!(resolved.pass_threshold, 70);
        assert_eq!(resolved.tone, Tone::Formal);
        assert_eq!(resolved.honesty_level, HonestyLevel::Diplomatic);
        assert_eq!(resolved.mandatory_questions, vec!["Why this role?".to_string()]);
        assert_eq!(resolved.session_timeout_minutes, 30);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let stored = StoredPrequalConfig {
            workspace_id: "ws-1".into(),
            pass_threshold: Some(140),
            max_dialogue_turns: Some(0),
            session_timeout_minutes: Some(-5),
            ..Default::default()
        };
        let resolved = resolve_effective_config(Some(&stored), &PrequalConfig::default());

        assert_eq!(resolved.pass_threshold, 100);
        assert_eq!(resolved.max_dialogue_turns, 1);
        assert_eq!(resolved.session_timeout_minutes, 1);
    }
}
