use serde::{Deserialize, Serialize};

/// Output of the upstream resume extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResume {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub structured: Option<ResumeStructure>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeStructure {
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub company: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub year: Option<String>,
}

impl ParsedResume {
    pub fn is_structured(&self) -> bool {
        self.structured.is_some()
    }

    /// Compact plain-text digest used inside model prompts.
    pub fn summary_text(&self) -> String {
        let Some(structured) = &self.structured else {
            return self.raw_text.chars().take(2000).collect();
        };

        let mut lines = Vec::new();
        if let Some(name) = &structured.personal_info.name {
            lines.push(format!("Name: {}", name));
        }
        if let Some(summary) = structured.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.push(format!("Summary: {}", summary.trim()));
        }
        if !structured.experience.is_empty() {
            lines.push("Experience:".to_string());
            for entry in &structured.experience {
                let period = match (&entry.start_date, &entry.end_date) {
                    (Some(start), Some(end)) => format!(" ({} - {})", start, end),
                    (Some(start), None) => format!(" ({} - present)", start),
                    _ => String::new(),
                };
                lines.push(format!(
                    "- {} at {}{}",
                    entry.position.as_deref().unwrap_or("Unknown role"),
                    entry.company.as_deref().unwrap_or("unknown company"),
                    period
                ));
                if let Some(description) = entry.description.as_deref() {
                    lines.push(format!("  {}", description.trim()));
                }
            }
        }
        if !structured.education.is_empty() {
            lines.push("Education:".to_string());
            for entry in &structured.education {
                let parts: Vec<&str> = [&entry.degree, &entry.field, &entry.institution, &entry.year]
                    .into_iter()
                    .filter_map(|part| part.as_deref())
                    .collect();
                lines.push(format!("- {}", parts.join(", ")));
            }
        }
        if !structured.skills.is_empty() {
            lines.push(format!("Skills: {}", structured.skills.join(", ")));
        }
        if !structured.languages.is_empty() {
            lines.push(format!("Languages: {}", structured.languages.join(", ")));
        }
        lines.join("\n")
    }
}
