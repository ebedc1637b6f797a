use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::evaluation::{EvaluationResult, FitDecision};
use crate::models::prequal_config::{HonestyLevel, Tone};
use crate::services::ai_service::CompletionClient;

/// Normalized feedback shorter than this is treated as a failed generation.
pub const MIN_FEEDBACK_LENGTH: usize = 50;

#[derive(Debug, Clone)]
pub struct FeedbackOptions {
    pub honesty_level: HonestyLevel,
    pub tone: Tone,
    pub fit_decision: FitDecision,
    pub fit_score: i32,
    pub vacancy_title: String,
}

#[derive(Clone)]
pub struct FeedbackGeneratorService {
    completion: Arc<dyn CompletionClient>,
}

impl FeedbackGeneratorService {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    pub async fn generate_feedback(
        &self,
        evaluation: &EvaluationResult,
        options: &FeedbackOptions,
    ) -> Result<String> {
        let prompt = build_feedback_prompt(evaluation, options);
        let raw = self.completion.complete(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, "Feedback completion failed");
            Error::AiService(e.to_string())
        })?;

        let feedback = scrub_scores(&normalize_feedback(&raw));
        let length = feedback.chars().count();
        if length < MIN_FEEDBACK_LENGTH {
            tracing::warn!(
                length,
                fit_decision = %options.fit_decision,
                "Generated feedback too short"
            );
            return Err(Error::FeedbackGenerationFailed(format!(
                "feedback has {} characters, expected at least {}",
                length, MIN_FEEDBACK_LENGTH
            )));
        }

        tracing::debug!(
            length,
            fit_score = options.fit_score,
            honesty_level = %options.honesty_level,
            tone = %options.tone,
            "Candidate feedback generated"
        );
        Ok(feedback)
    }
}

fn honesty_directive(level: HonestyLevel) -> &'static str {
    match level {
        HonestyLevel::Direct => {
            "Be clear and straightforward about the outcome and the gaps. Do not soften the conclusion."
        }
        HonestyLevel::Diplomatic => {
            "Be honest but tactful. Acknowledge strengths first, then frame gaps constructively."
        }
        HonestyLevel::Encouraging => {
            "Emphasize potential and growth. Frame every gap as something the candidate can develop."
        }
    }
}

fn tone_directive(tone: Tone) -> &'static str {
    match tone {
        Tone::Formal => "Use a formal, professional register. No slang, no emoji.",
        Tone::Friendly => "Use a warm, conversational register addressed directly to the candidate.",
    }
}

fn focus_directive(decision: FitDecision) -> &'static str {
    match decision {
        FitDecision::StrongFit => {
            "Explain why their background matches the role well and that the team will be in touch about next steps."
        }
        FitDecision::PotentialFit => {
            "Highlight the strengths that match the role and name the areas the team will want to explore further."
        }
        FitDecision::NotFit => {
            "Thank them sincerely, explain the main gaps relative to this role and suggest what would strengthen a future application."
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none noted)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

// Numeric scores stay out of the prompt so the model cannot echo them.
fn build_feedback_prompt(evaluation: &EvaluationResult, options: &FeedbackOptions) -> String {
    format!(
        r#"Write short feedback (one to three paragraphs) for a candidate who just completed a prequalification interview for the role "{title}".

Style: {honesty} {tone}
Focus: {focus}

Strengths observed:
{strengths}

Areas to develop:
{risks}

Rules:
- Never mention scores, percentages, ratings or internal decision labels.
- Do not invent facts beyond the notes above.
- Output plain text only, without headings, markdown or surrounding quotes."#,
        title = options.vacancy_title.trim(),
        honesty = honesty_directive(options.honesty_level),
        tone = tone_directive(options.tone),
        focus = focus_directive(options.fit_decision),
        strengths = bullet_list(&evaluation.strengths),
        risks = bullet_list(&evaluation.risks),
    )
}

/// True when `inner` holds no quote that would close the opening one early.
/// Apostrophes inside words do not count as single quotes.
fn quotes_balanced_inside(inner: &str, open: char, close: char) -> bool {
    let chars: Vec<char> = inner.chars().collect();
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate() {
        let intra_word = i > 0
            && chars[i - 1].is_alphanumeric()
            && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
        if open == close {
            if c == open && !(open == '\'' && intra_word) {
                return false;
            }
        } else if c == open {
            depth += 1;
        } else if c == close {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        }
    }
    depth == 0
}

fn strip_wrapping_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('«', '»')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            let inner = &text[open.len_utf8()..text.len() - close.len_utf8()];
            if quotes_balanced_inside(inner, open, close) {
                return inner.trim();
            }
            return text;
        }
    }
    text
}

fn clean_line(line: &str) -> String {
    let line = line.trim();
    let line = line.trim_start_matches('#').trim_start();
    let line = line.strip_prefix("> ").unwrap_or(line);
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    line.replace("**", "").replace("__", "").replace('`', "")
}

/// Strips code fences and markdown, collapses blank-line runs and removes
/// quotes wrapping the whole text.
pub fn normalize_feedback(raw: &str) -> String {
    let unfenced = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut out: Vec<String> = Vec::new();
    for line in strip_wrapping_quotes(&unfenced).lines() {
        let cleaned = clean_line(line);
        if cleaned.is_empty() && out.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        out.push(cleaned);
    }
    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }

    strip_wrapping_quotes(&out.join("\n")).to_string()
}

fn score_suffix_len(text: &str) -> Option<usize> {
    if text.starts_with("/100") {
        Some(4)
    } else if text.starts_with('%') {
        Some(1)
    } else if text
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("out of 100"))
    {
        Some(10)
    } else {
        None
    }
}

const SCORE_WORDS: &[&str] = &["score", "rated", "rating", "match"];

// Percentages are only scores when a score word sits next to them.
fn near_score_word(before: &str, after: &str) -> bool {
    let is_score_word = |word: &str| {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        SCORE_WORDS.iter().any(|s| word.starts_with(s))
    };
    before.split_whitespace().rev().take(4).any(is_score_word)
        || after.split_whitespace().take(3).any(is_score_word)
}

/// Removes score-shaped numbers ("72/100", "72 out of 100", or "72%" next to
/// a score word) that a model may emit despite the prompt.
pub fn scrub_scores(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(c) = rest.chars().next() {
        if c.is_ascii_digit() && !prev.is_some_and(|p| p.is_alphanumeric()) {
            let digits = rest
                .find(|ch: char| !ch.is_ascii_digit())
                .unwrap_or(rest.len());
            let after = rest[digits..].trim_start_matches(' ');
            let scrub = score_suffix_len(after).filter(|&suffix| {
                !after.starts_with('%') || near_score_word(&out, &after[suffix..])
            });
            if let Some(suffix) = scrub {
                rest = &after[suffix..];
                prev = Some(' ');
                continue;
            }
            out.push_str(&rest[..digits]);
            prev = rest[..digits].chars().last();
            rest = &rest[digits..];
            continue;
        }
        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }

    out.lines()
        .map(|line| {
            line.split(' ')
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
                .replace(" .", ".")
                .replace(" ,", ",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluation::{DimensionScore, EvaluationDimensions};
    use crate::services::ai_service::{CompletionError, MockCompletionClient};

    fn dimension(score: i32) -> DimensionScore {
        DimensionScore {
            score,
            confidence: 0.7,
            notes: String::new(),
        }
    }

    fn evaluation() -> EvaluationResult {
        EvaluationResult {
            fit_score: 73,
            fit_decision: FitDecision::PotentialFit,
            dimensions: EvaluationDimensions {
                hard_skills: dimension(81),
                soft_skills: dimension(64),
                culture_fit: dimension(70),
                salary_alignment: dimension(55),
            },
            strengths: vec!["Solid Rust background".into()],
            risks: vec!["Little exposure to payments".into()],
            recommendation: "Technical interview".into(),
            ai_summary: "Promising backend engineer".into(),
        }
    }

    fn options(honesty_level: HonestyLevel, tone: Tone) -> FeedbackOptions {
        FeedbackOptions {
            honesty_level,
            tone,
            fit_decision: FitDecision::PotentialFit,
            fit_score: 73,
            vacancy_title: "Backend Engineer".into(),
        }
    }

    const GOOD_FEEDBACK: &str = "Thank you for taking the time to talk with us about the Backend Engineer role. Your Rust background stood out.";

    #[tokio::test]
    async fn prompt_follows_policy_and_hides_scores() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .withf(|prompt: &str| {
                prompt.contains("Backend Engineer")
                    && prompt.contains("formal, professional")
                    && prompt.contains("Do not soften")
                    && prompt.contains("explore further")
                    && prompt.contains("Solid Rust background")
                    && !prompt.contains("73")
                    && !prompt.contains("81")
            })
            .times(1)
            .returning(|_| Ok(GOOD_FEEDBACK.to_string()));

        let feedback = FeedbackGeneratorService::new(Arc::new(mock))
            .generate_feedback(&evaluation(), &options(HonestyLevel::Direct, Tone::Formal))
            .await
            .unwrap();
        assert_eq!(feedback, GOOD_FEEDBACK);
    }

    #[tokio::test]
    async fn short_output_is_a_generation_failure() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .returning(|_| Ok("```\n\"Thanks!\"\n```".to_string()));

        let err = FeedbackGeneratorService::new(Arc::new(mock))
            .generate_feedback(&evaluation(), &options(HonestyLevel::Diplomatic, Tone::Friendly))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FEEDBACK_GENERATION_FAILED");
    }

    #[tokio::test]
    async fn completion_errors_are_ai_service_errors() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().returning(|_| Err(CompletionError::EmptyContent));

        let err = FeedbackGeneratorService::new(Arc::new(mock))
            .generate_feedback(&evaluation(), &options(HonestyLevel::Encouraging, Tone::Friendly))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiService(_)));
    }

    #[test]
    fn normalization_strips_markdown_fences_and_quotes() {
        let raw = "```text\n\"## Your interview\n\n\n\n**Great** conversation.\n- Strong Rust\n\"\n```";
        assert_eq!(
            normalize_feedback(raw),
            "Your interview\n\nGreat conversation.\nStrong Rust"
        );
    }

    #[test]
    fn separate_quoted_phrases_are_left_intact() {
        let raw = "\"Reliable\" is how your references describe you, and you are \"a great communicator\"";
        assert_eq!(normalize_feedback(raw), raw);

        let raw = "“Calm” under pressure and “curious” by nature";
        assert_eq!(normalize_feedback(raw), raw);
    }

    #[test]
    fn wrapping_quotes_with_apostrophes_are_stripped() {
        assert_eq!(
            normalize_feedback("'It's been a pleasure talking with you'"),
            "It's been a pleasure talking with you"
        );
        assert_eq!(
            normalize_feedback("“You said “ownership” matters to you”"),
            "You said “ownership” matters to you"
        );
    }

    #[test]
    fn score_shaped_numbers_are_scrubbed() {
        assert_eq!(
            scrub_scores("You scored 72/100 overall, about 72 % of the bar. You have 5 years of Rust."),
            "You scored overall, about of the bar. You have 5 years of Rust."
        );
        assert_eq!(scrub_scores("A 64 out of 100 result."), "A result.");
        assert_eq!(scrub_scores("Version v2/100 stays"), "Version v2/100 stays");
    }

    #[test]
    fn plain_percentages_survive_scrubbing() {
        let text = "The role is 100% remote and you would spend 50% of your time on Rust.";
        assert_eq!(scrub_scores(text), text);
        assert_eq!(
            scrub_scores("Your profile is an 85% match for the team."),
            "Your profile is an match for the team."
        );
        assert_eq!(scrub_scores("We rated you 70 % overall."), "We rated you overall.");
    }
}
