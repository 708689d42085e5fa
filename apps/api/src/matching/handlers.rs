//! Axum route handlers for the relevance API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::errors::AppError;
use crate::matching::fitness::FitnessScoreResult;
use crate::matching::grouped::GroupedRelevantJobs;
use crate::matching::predicate::{Combinator, SalaryFilter, SalarySource};
use crate::matching::relevance::{sort_by_fitness, RelevanceOptions, RelevantJobsPage};
use crate::state::AppState;

/// Query string shared by the flat and grouped relevance endpoints.
/// List-valued fields are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct RelevantJobsQuery {
    pub country: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub salary_source: Option<String>,
    pub combine_with: Option<String>,
    #[serde(default)]
    pub use_canonical_titles: bool,
    #[serde(default)]
    pub include_score: bool,
    pub preferred: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl RelevantJobsQuery {
    pub fn into_options(self, limits: &MatchingConfig) -> Result<RelevanceOptions, AppError> {
        let salary_given = self.salary_min.is_some()
            || self.salary_max.is_some()
            || self.salary_currency.is_some()
            || self.salary_source.is_some();
        let salary = if salary_given {
            Some(SalaryFilter {
                min: self.salary_min,
                max: self.salary_max,
                currency: self.salary_currency,
                source: self
                    .salary_source
                    .as_deref()
                    .map(str::parse::<SalarySource>)
                    .transpose()?
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(RelevanceOptions {
            country: self.country.as_deref().map(split_list).unwrap_or_default(),
            salary,
            combine_with: self
                .combine_with
                .as_deref()
                .map(str::parse::<Combinator>)
                .transpose()?
                .unwrap_or_default(),
            use_canonical_titles: self.use_canonical_titles,
            include_score: self.include_score,
            preferred_override: self.preferred.as_deref().map(split_list),
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(limits.default_page_limit),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// GET /api/v1/candidates/:id/relevant-jobs
///
/// With `include_score` the page is returned best fit first.
pub async fn handle_relevant_jobs(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(query): Query<RelevantJobsQuery>,
) -> Result<Json<RelevantJobsPage>, AppError> {
    let options = query.into_options(&state.config.matching)?;
    let mut page = state
        .relevance
        .get_relevant_jobs(candidate_id, &options)
        .await?;
    if options.include_score {
        sort_by_fitness(&mut page.data);
    }
    Ok(Json(page))
}

/// GET /api/v1/candidates/:id/relevant-jobs/grouped
pub async fn handle_relevant_jobs_grouped(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(query): Query<RelevantJobsQuery>,
) -> Result<Json<GroupedRelevantJobs>, AppError> {
    let options = query.into_options(&state.config.matching)?;
    let grouped = state
        .relevance
        .get_relevant_jobs_grouped(candidate_id, &options)
        .await?;
    Ok(Json(grouped))
}

/// GET /api/v1/candidates/:id/jobs/:job_id/fitness
pub async fn handle_job_fitness(
    State(state): State<AppState>,
    Path((candidate_id, job_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FitnessScoreResult>, AppError> {
    Ok(Json(state.relevance.fitness(candidate_id, job_id).await?))
}
