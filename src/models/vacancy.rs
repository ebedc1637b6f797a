use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vacancy {
    pub id: Uuid,
    pub workspace_id: String,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Vacancy {
    pub fn salary_label(&self) -> Option<String> {
        let currency = self.currency.as_deref().unwrap_or("");
        match (self.salary_from, self.salary_to) {
            (Some(from), Some(to)) => Some(format!("{}-{} {}", from, to, currency).trim().to_string()),
            (Some(from), None) => Some(format!("from {} {}", from, currency).trim().to_string()),
            (None, Some(to)) => Some(format!("up to {} {}", to, currency).trim().to_string()),
            (None, None) => None,
        }
    }
}
