use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::models::evaluation::{DimensionScore, EvaluationDimensions, EvaluationResult, FitDecision};
use crate::models::message::{DialogueMessage, MessageRole};
use crate::models::prequal_config::PrequalConfig;
use crate::models::resume::ParsedResume;
use crate::models::vacancy::Vacancy;
use crate::services::ai_service::{extract_json_object, CompletionClient};

const MAX_LIST_ITEMS: usize = 10;

#[derive(Clone)]
pub struct EvaluatorService {
    completion: Arc<dyn CompletionClient>,
}

impl EvaluatorService {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    pub async fn evaluate(
        &self,
        parsed_resume: Option<&ParsedResume>,
        history: &[DialogueMessage],
        vacancy: &Vacancy,
        config: &PrequalConfig,
    ) -> Result<EvaluationResult> {
        let resume = parsed_resume
            .filter(|resume| resume.is_structured())
            .ok_or_else(|| Error::InsufficientData("resume has no structured content".to_string()))?;
        if history.is_empty() {
            return Err(Error::InsufficientData("dialogue history is empty".to_string()));
        }
        if vacancy.title.trim().is_empty() {
            return Err(Error::InsufficientData("vacancy has no title".to_string()));
        }

        let prompt = build_evaluation_prompt(resume, history, vacancy);
        let raw = self.completion.complete(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, vacancy_id = %vacancy.id, "Evaluation completion failed");
            Error::AiService(e.to_string())
        })?;

        let result = parse_evaluation(&raw, config.pass_threshold)?;
        tracing::info!(
            vacancy_id = %vacancy.id,
            fit_score = result.fit_score,
            fit_decision = %result.fit_decision,
            pass_threshold = config.pass_threshold,
            "Candidate evaluated"
        );
        Ok(result)
    }
}

pub fn transcript(history: &[DialogueMessage]) -> String {
    history
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::Assistant => "Interviewer",
                MessageRole::User => "Candidate",
            };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_evaluation_prompt(
    resume: &ParsedResume,
    history: &[DialogueMessage],
    vacancy: &Vacancy,
) -> String {
    let mut vacancy_block = format!("Title: {}", vacancy.title.trim());
    if let Some(description) = vacancy.description.as_deref() {
        vacancy_block.push_str(&format!("\nDescription: {}", description.trim()));
    }
    if let Some(requirements) = vacancy.requirements.as_deref() {
        vacancy_block.push_str(&format!("\nRequirements: {}", requirements.trim()));
    }
    if let Some(salary) = vacancy.salary_label() {
        vacancy_block.push_str(&format!("\nSalary: {}", salary));
    }

    format!(
        r#"You are an experienced, unbiased technical recruiter. Evaluate how well the candidate fits the vacancy using the resume and the prequalification interview below.

VACANCY
{vacancy}

RESUME
{resume}

INTERVIEW TRANSCRIPT
{transcript}

Score four dimensions from 0 to 100, each with a confidence from 0 to 1 and short notes:
- hardSkills: required technical and professional skills
- softSkills: communication, ownership, collaboration
- cultureFit: motivation and working-style match
- salaryAlignment: match between expectations and the offer (use low confidence if unknown)

Respond with a single JSON object and nothing else:
{{
  "fitScore": <0-100>,
  "dimensions": {{
    "hardSkills": {{"score": <0-100>, "confidence": <0-1>, "notes": "..."}},
    "softSkills": {{"score": <0-100>, "confidence": <0-1>, "notes": "..."}},
    "cultureFit": {{"score": <0-100>, "confidence": <0-1>, "notes": "..."}},
    "salaryAlignment": {{"score": <0-100>, "confidence": <0-1>, "notes": "..."}}
  }},
  "strengths": ["..."],
  "risks": ["..."],
  "recommendation": "...",
  "summary": "..."
}}"#,
        vacancy = vacancy_block,
        resume = resume.summary_text(),
        transcript = transcript(history),
    )
}

fn number(value: &JsonValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n: &f64| n.is_finite())
}

fn text(value: Option<&JsonValue>) -> String {
    value
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn text_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(MAX_LIST_ITEMS)
                .collect()
        })
        .unwrap_or_default()
}

fn dimension(dimensions: &JsonValue, key: &str) -> Result<DimensionScore> {
    let raw = dimensions
        .get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| Error::InvalidEvaluationResult(format!("missing dimension {}", key)))?;
    let score = raw
        .get("score")
        .and_then(number)
        .ok_or_else(|| Error::InvalidEvaluationResult(format!("dimension {} has no score", key)))?;

    Ok(DimensionScore {
        score: score.clamp(0.0, 100.0).round() as i32,
        confidence: raw
            .get("confidence")
            .and_then(number)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        notes: text(raw.get("notes")),
    })
}

/// Validates model output and applies the pass-threshold decision rule.
pub fn parse_evaluation(raw: &str, pass_threshold: i32) -> Result<EvaluationResult> {
    let value = extract_json_object(raw).ok_or_else(|| {
        Error::InvalidEvaluationResult("no JSON object in model output".to_string())
    })?;

    let fit_score = value
        .get("fitScore")
        .and_then(number)
        .ok_or_else(|| Error::InvalidEvaluationResult("fitScore is missing".to_string()))?;
    if !(0.0..=100.0).contains(&fit_score) {
        return Err(Error::InvalidEvaluationResult(format!(
            "fitScore {} is outside 0-100",
            fit_score
        )));
    }
    let fit_score = fit_score.round() as i32;

    // Some models flatten the dimensions into the top-level object.
    let dimensions = value.get("dimensions").unwrap_or(&value);
    let dimensions = EvaluationDimensions {
        hard_skills: dimension(dimensions, "hardSkills")?,
        soft_skills: dimension(dimensions, "softSkills")?,
        culture_fit: dimension(dimensions, "cultureFit")?,
        salary_alignment: dimension(dimensions, "salaryAlignment")?,
    };

    let ai_summary = match text(value.get("summary")) {
        s if s.is_empty() => text(value.get("aiSummary")),
        s => s,
    };

    Ok(EvaluationResult {
        fit_score,
        fit_decision: FitDecision::from_score(fit_score, pass_threshold),
        dimensions,
        strengths: text_list(value.get("strengths")),
        risks: text_list(value.get("risks")),
        recommendation: text(value.get("recommendation")),
        ai_summary,
    })
}
