use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Points above the pass threshold needed for a strong fit.
pub const STRONG_FIT_MARGIN: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitDecision {
    StrongFit,
    PotentialFit,
    NotFit,
}

impl FitDecision {
    pub fn from_score(fit_score: i32, pass_threshold: i32) -> Self {
        if fit_score >= pass_threshold + STRONG_FIT_MARGIN {
            FitDecision::StrongFit
        } else if fit_score >= pass_threshold {
            FitDecision::PotentialFit
        } else {
            FitDecision::NotFit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FitDecision::StrongFit => "strong_fit",
            FitDecision::PotentialFit => "potential_fit",
            FitDecision::NotFit => "not_fit",
        }
    }
}

impl fmt::Display for FitDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong_fit" => Ok(FitDecision::StrongFit),
            "potential_fit" => Ok(FitDecision::PotentialFit),
            "not_fit" => Ok(FitDecision::NotFit),
            other => Err(format!("unknown fit decision: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub score: i32,
    pub confidence: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDimensions {
    pub hard_skills: DimensionScore,
    pub soft_skills: DimensionScore,
    pub culture_fit: DimensionScore,
    pub salary_alignment: DimensionScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub fit_score: i32,
    pub fit_decision: FitDecision,
    pub dimensions: EvaluationDimensions,
    pub strengths: Vec<String>,
    pub risks: Vec<String>,
    pub recommendation: String,
    pub ai_summary: String,
}
