//! Preference Store: a candidate's priority-ordered desired job titles.
//!
//! Postcondition of every mutating call: the candidate's priorities are exactly 1..N.

pub mod handlers;
pub mod ordering;
pub mod repository;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::preference::CandidatePreferenceRow;
use crate::preferences::ordering::title_key;
use crate::preferences::repository::PreferenceRepository;
use crate::store::TitleCatalog;

#[derive(Clone)]
pub struct PreferenceStore {
    repo: Arc<dyn PreferenceRepository>,
    catalog: Arc<dyn TitleCatalog>,
}

impl PreferenceStore {
    pub fn new(repo: Arc<dyn PreferenceRepository>, catalog: Arc<dyn TitleCatalog>) -> Self {
        Self { repo, catalog }
    }

    pub async fn list(&self, candidate_id: Uuid) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        self.repo.list(candidate_id).await
    }

    /// Adds `title` after the lowest-priority preference, or moves it to the top if the
    /// candidate already has it. The title must be active in the canonical catalog.
    ///
    /// An unknown candidate is `NotFound` whatever the title.
    pub async fn add(
        &self,
        candidate_id: Uuid,
        title: &str,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        self.repo.list(candidate_id).await?;
        let requested = title.trim();
        if requested.is_empty() {
            return Err(AppError::InvalidInput("title cannot be empty".to_string()));
        }
        let canonical = self
            .catalog
            .find_active_by_title(requested)
            .await?
            .ok_or_else(|| {
                AppError::InvalidInput(format!("'{requested}' is not an active job title"))
            })?;

        let rows = self
            .repo
            .update(
                candidate_id,
                Box::new(move |rows| {
                    ordering::upsert(rows, candidate_id, &canonical, Utc::now());
                    Ok(())
                }),
            )
            .await?;
        info!("Candidate {candidate_id} added preference '{requested}'");
        Ok(rows)
    }

    /// Removing a title the candidate does not have is a no-op.
    pub async fn remove(
        &self,
        candidate_id: Uuid,
        title: &str,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        let title = title.to_string();
        self.repo
            .update(
                candidate_id,
                Box::new(move |rows| {
                    ordering::remove(rows, &title);
                    Ok(())
                }),
            )
            .await
    }

    pub async fn reorder_by_ids(
        &self,
        candidate_id: Uuid,
        ordered_ids: Vec<Uuid>,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        self.repo
            .update(
                candidate_id,
                Box::new(move |rows| ordering::reorder_by_ids(rows, &ordered_ids)),
            )
            .await
    }

    pub async fn reorder_by_titles(
        &self,
        candidate_id: Uuid,
        ordered_titles: Vec<String>,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        self.repo
            .update(
                candidate_id,
                Box::new(move |rows| ordering::reorder_by_titles(rows, &ordered_titles)),
            )
            .await
    }

    /// Resolves `job_title_id` for rows that lack one. Returns how many rows were resolved.
    pub async fn backfill_canonical_ids(&self, candidate_id: Uuid) -> Result<usize, AppError> {
        let (resolved, _) = self.backfill(candidate_id).await?;
        Ok(resolved)
    }

    /// Preferences with canonical ids resolved where the catalog knows the title.
    pub async fn list_resolved(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        let (_, rows) = self.backfill(candidate_id).await?;
        Ok(rows)
    }

    async fn backfill(
        &self,
        candidate_id: Uuid,
    ) -> Result<(usize, Vec<CandidatePreferenceRow>), AppError> {
        let rows = self.repo.list(candidate_id).await?;
        let unresolved: BTreeSet<String> = rows
            .iter()
            .filter(|r| r.job_title_id.is_none())
            .map(|r| r.title.trim().to_string())
            .collect();
        if unresolved.is_empty() {
            return Ok((0, rows));
        }

        let titles: Vec<String> = unresolved.into_iter().collect();
        let lookup: HashMap<String, Uuid> = self
            .catalog
            .find_many_by_titles(&titles)
            .await?
            .into_iter()
            .map(|t| (title_key(&t.title), t.id))
            .collect();
        if lookup.is_empty() {
            return Ok((0, rows));
        }

        let before = rows.iter().filter(|r| r.job_title_id.is_some()).count();
        let rows = self
            .repo
            .update(
                candidate_id,
                Box::new(move |rows| {
                    ordering::assign_title_ids(rows, &lookup, Utc::now());
                    Ok(())
                }),
            )
            .await?;
        let resolved = rows
            .iter()
            .filter(|r| r.job_title_id.is_some())
            .count()
            .saturating_sub(before);
        if resolved > 0 {
            info!("Backfilled {resolved} canonical title ids for candidate {candidate_id}");
        }
        Ok((resolved, rows))
    }
}
