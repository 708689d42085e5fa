//! Grouped relevance: one relevance query per preferred title, each group ranked by fitness.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::profile::legacy_preferred_titles;
use crate::matching::relevance::{
    sort_by_fitness, CandidateContext, RelevanceEngine, RelevanceOptions, RelevantJob,
};

#[derive(Debug, Clone, Serialize)]
pub struct RelevantJobGroup {
    pub title: String,
    pub jobs: Vec<RelevantJob>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupedRelevantJobs {
    pub groups: Vec<RelevantJobGroup>,
}

impl RelevanceEngine {
    /// Runs the relevance query once per preferred title, in priority order.
    ///
    /// Titles come from the Preference Store, then the deprecated `preferred_titles` profile
    /// field, then `options.preferred_override`. Any sub-query failure fails the whole call.
    pub async fn get_relevant_jobs_grouped(
        &self,
        candidate_id: Uuid,
        options: &RelevanceOptions,
    ) -> Result<GroupedRelevantJobs, AppError> {
        options.validate(self.limits())?;
        // Profile extraction is pure, so one load serves every group.
        let candidate = self.load_candidate(candidate_id).await?;
        let titles = self.grouping_titles(&candidate, options).await?;

        let mut groups = Vec::with_capacity(titles.len());
        for title in titles {
            let per_title = RelevanceOptions {
                preferred_override: Some(vec![title.clone()]),
                include_score: true,
                ..options.clone()
            };
            let mut jobs = self.relevant_jobs_for(&candidate, &per_title).await?.data;
            sort_by_fitness(&mut jobs);
            groups.push(RelevantJobGroup { title, jobs });
        }

        info!(
            "Grouped relevance for candidate {candidate_id}: {} groups",
            groups.len()
        );
        Ok(GroupedRelevantJobs { groups })
    }

    async fn grouping_titles(
        &self,
        candidate: &CandidateContext,
        options: &RelevanceOptions,
    ) -> Result<Vec<String>, AppError> {
        let stored: Vec<String> = self
            .preferences
            .list(candidate.candidate_id)
            .await?
            .into_iter()
            .map(|row| row.title)
            .collect();
        if !stored.is_empty() {
            return Ok(stored);
        }

        let legacy = legacy_preferred_titles(candidate.blob.as_ref());
        if !legacy.is_empty() {
            return Ok(legacy);
        }

        Ok(options.preferred_override.clone().unwrap_or_default())
    }
}
