use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Canonical job title from the curated catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobTitleRow {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
}
