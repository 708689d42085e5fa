//! Collaborator seams consumed by the matching engine.
//!
//! Production wiring uses the Postgres implementations in `postgres`; unit tests swap in
//! in-memory doubles. `AppState` carries them as `Arc<dyn Trait>`.

pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::predicate::Predicate;
use crate::models::posting::JobPostingRow;
use crate::models::title::JobTitleRow;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Debug, Clone)]
pub struct PostingPage {
    pub rows: Vec<JobPostingRow>,
    /// Count of all matching rows, not just this page.
    pub total: i64,
}

#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Counts and fetches one page of postings matching `predicate`, newest first.
    async fn find_page(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> Result<PostingPage, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobPostingRow>, AppError>;
}

/// Canonical title catalog. Title lookups are case-insensitive.
#[async_trait]
pub trait TitleCatalog: Send + Sync {
    async fn find_active_by_title(&self, title: &str) -> Result<Option<JobTitleRow>, AppError>;

    /// Ignores the active flag.
    async fn find_many_by_ids(&self, ids: &[Uuid]) -> Result<Vec<JobTitleRow>, AppError>;

    /// Ignores the active flag.
    async fn find_many_by_titles(&self, titles: &[String]) -> Result<Vec<JobTitleRow>, AppError>;
}

#[async_trait]
pub trait CandidateProfileStore: Send + Sync {
    async fn candidate_exists(&self, candidate_id: Uuid) -> Result<bool, AppError>;

    /// Raw blob of the candidate's most recently updated job profile.
    async fn most_recent_job_profile(&self, candidate_id: Uuid)
        -> Result<Option<Value>, AppError>;
}
