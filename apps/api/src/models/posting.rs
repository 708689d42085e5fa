use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A job posting as read by the matching engine. Tag fields are agency-authored JSON and
/// may be null or shaped unexpectedly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub agency_id: Option<Uuid>,
    pub title: String,
    pub country: Option<String>,
    pub salary_amount: Option<f64>,
    pub salary_currency: Option<String>,
    pub skills: Option<Value>,
    pub education_requirements: Option<Value>,
    pub experience_requirements: Option<Value>,
    /// Canonical titles associated through `job_posting_titles`.
    pub title_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}
