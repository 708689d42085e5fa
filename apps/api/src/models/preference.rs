use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CandidatePreferenceRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub title: String,
    /// 1-based, dense per candidate.
    pub priority: i32,
    pub job_title_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
