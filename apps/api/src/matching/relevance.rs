//! Relevance Query Builder: decides which postings are relevant to a candidate.
//!
//! Base match = title-match group OR tags group. Hard filters (country, salary) are OR'd
//! into one group and joined to the base match with the requested combinator.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::errors::AppError;
use crate::matching::fitness::{calculate_score, FitnessScoreResult};
use crate::matching::predicate::{Combinator, Predicate, SalaryFilter};
use crate::matching::profile::{normalize_profile, CandidateProfile};
use crate::matching::requirements::extract_requirements;
use crate::models::posting::JobPostingRow;
use crate::preferences::PreferenceStore;
use crate::store::{CandidateProfileStore, PageRequest, PostingStore, TitleCatalog};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceOptions {
    /// Substring needles, any of which may match the posting country.
    pub country: Vec<String>,
    pub salary: Option<SalaryFilter>,
    pub combine_with: Combinator,
    pub use_canonical_titles: bool,
    pub include_score: bool,
    /// Titles or canonical ids used instead of the stored preferences.
    pub preferred_override: Option<Vec<String>>,
    pub page: i64,
    pub limit: i64,
}

impl Default for RelevanceOptions {
    fn default() -> Self {
        Self {
            country: Vec::new(),
            salary: None,
            combine_with: Combinator::And,
            use_canonical_titles: false,
            include_score: false,
            preferred_override: None,
            page: 1,
            limit: 10,
        }
    }
}

impl RelevanceOptions {
    pub fn validate(&self, limits: &MatchingConfig) -> Result<PageRequest, AppError> {
        if self.page < 1 {
            return Err(AppError::InvalidInput(format!(
                "page must be at least 1, got {}",
                self.page
            )));
        }
        if !(1..=limits.max_page_limit).contains(&self.limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                limits.max_page_limit, self.limit
            )));
        }
        if (self.page - 1).checked_mul(self.limit).is_none() {
            return Err(AppError::InvalidInput(format!(
                "page {} is out of range for limit {}",
                self.page, self.limit
            )));
        }
        if let Some(salary) = &self.salary {
            salary.validate()?;
        }
        Ok(PageRequest {
            page: self.page,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelevantJob {
    #[serde(flatten)]
    pub posting: JobPostingRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_score: Option<FitnessScoreResult>,
}

impl RelevantJob {
    pub fn score(&self) -> u32 {
        self.fitness_score.as_ref().map_or(0, |f| f.score)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelevantJobsPage {
    pub data: Vec<RelevantJob>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// The candidate's preferred canonical titles, as far as they could be resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferredTitles {
    /// Whether the candidate declared any preference at all, resolvable or not.
    pub has_preferences: bool,
    pub title_ids: Vec<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Predicate construction
// ────────────────────────────────────────────────────────────────────────────

/// Builds the relevance predicate for one candidate.
///
/// A candidate without preferences is never filtered by the base match, so new users see
/// the whole pool. A candidate with preferences but nothing to match on sees nothing
/// beyond their title matches.
pub fn build_relevance_predicate(
    profile: &CandidateProfile,
    preferred: &PreferredTitles,
    options: &RelevanceOptions,
) -> Predicate {
    let title_ids = &preferred.title_ids;

    let title_group = if !preferred.has_preferences {
        Predicate::Always
    } else if title_ids.is_empty() {
        Predicate::Never
    } else {
        Predicate::TitleIdsAny(title_ids.clone())
    };

    let mut tag_predicates = Vec::new();
    if !profile.skills.is_empty() {
        tag_predicates.push(Predicate::SkillsOverlap(lowered(&profile.skills)));
    }
    if !profile.education.is_empty() {
        tag_predicates.push(Predicate::EducationOverlap(lowered(&profile.education)));
    }
    if options.use_canonical_titles && !title_ids.is_empty() {
        tag_predicates.push(Predicate::TitleIdsAny(title_ids.clone()));
    }
    let tags_group = if tag_predicates.is_empty() {
        if preferred.has_preferences {
            Predicate::Never
        } else {
            Predicate::Always
        }
    } else {
        Predicate::any(tag_predicates)
    };

    let base = Predicate::any(vec![title_group, tags_group]);

    let mut hard_filters = Vec::new();
    let needles: Vec<String> = options
        .country
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    if !needles.is_empty() {
        hard_filters.push(Predicate::CountryContains(needles));
    }
    if let Some(salary) = options.salary.as_ref().filter(|s| s.has_bounds()) {
        hard_filters.push(Predicate::Salary(salary.clone()));
    }

    if hard_filters.is_empty() {
        base
    } else {
        base.combine(Predicate::any(hard_filters), options.combine_with)
    }
}

/// Lower-cased, de-duplicated tags in first-seen order.
fn lowered(tags: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.iter()
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Everything the engine knows about a candidate for one request.
#[derive(Debug, Clone)]
pub struct CandidateContext {
    pub candidate_id: Uuid,
    pub profile: CandidateProfile,
    /// Raw profile blob, kept for the deprecated `preferred_titles` fallback.
    pub blob: Option<Value>,
}

#[derive(Clone)]
pub struct RelevanceEngine {
    pub(crate) postings: Arc<dyn PostingStore>,
    pub(crate) catalog: Arc<dyn TitleCatalog>,
    pub(crate) profiles: Arc<dyn CandidateProfileStore>,
    pub(crate) preferences: PreferenceStore,
    pub(crate) limits: MatchingConfig,
}

impl RelevanceEngine {
    pub fn new(
        postings: Arc<dyn PostingStore>,
        catalog: Arc<dyn TitleCatalog>,
        profiles: Arc<dyn CandidateProfileStore>,
        preferences: PreferenceStore,
        limits: MatchingConfig,
    ) -> Self {
        Self {
            postings,
            catalog,
            profiles,
            preferences,
            limits,
        }
    }

    pub fn limits(&self) -> &MatchingConfig {
        &self.limits
    }

    /// Loads and normalizes the candidate's most recent profile. Unknown candidate → `NotFound`.
    pub async fn load_candidate(&self, candidate_id: Uuid) -> Result<CandidateContext, AppError> {
        if !self.profiles.candidate_exists(candidate_id).await? {
            return Err(AppError::NotFound(format!("Candidate {candidate_id} not found")));
        }
        let blob = self.profiles.most_recent_job_profile(candidate_id).await?;
        Ok(CandidateContext {
            candidate_id,
            profile: normalize_profile(blob.as_ref()),
            blob,
        })
    }

    pub async fn get_relevant_jobs(
        &self,
        candidate_id: Uuid,
        options: &RelevanceOptions,
    ) -> Result<RelevantJobsPage, AppError> {
        options.validate(&self.limits)?;
        let candidate = self.load_candidate(candidate_id).await?;
        self.relevant_jobs_for(&candidate, options).await
    }

    /// Runs the relevance query for an already-loaded candidate.
    #[instrument(skip(self, candidate, options), fields(candidate_id = %candidate.candidate_id))]
    pub async fn relevant_jobs_for(
        &self,
        candidate: &CandidateContext,
        options: &RelevanceOptions,
    ) -> Result<RelevantJobsPage, AppError> {
        let page = options.validate(&self.limits)?;
        let preferred = match &options.preferred_override {
            Some(entries) => self.resolve_override(entries).await?,
            None => self.resolve_stored(candidate.candidate_id).await?,
        };

        let predicate = build_relevance_predicate(&candidate.profile, &preferred, options);
        debug!(?predicate, "relevance predicate built");

        let found = self.postings.find_page(&predicate, page).await?;
        let data = found
            .rows
            .into_iter()
            .map(|posting| {
                let fitness_score = options
                    .include_score
                    .then(|| calculate_score(&candidate.profile, &extract_requirements(&posting)));
                RelevantJob {
                    posting,
                    fitness_score,
                }
            })
            .collect();

        Ok(RelevantJobsPage {
            data,
            total: found.total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// Scores one posting for one candidate.
    pub async fn fitness(
        &self,
        candidate_id: Uuid,
        posting_id: Uuid,
    ) -> Result<FitnessScoreResult, AppError> {
        let candidate = self.load_candidate(candidate_id).await?;
        let posting = self
            .postings
            .find_by_id(posting_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job posting {posting_id} not found")))?;
        Ok(calculate_score(
            &candidate.profile,
            &extract_requirements(&posting),
        ))
    }

    async fn resolve_stored(&self, candidate_id: Uuid) -> Result<PreferredTitles, AppError> {
        let rows = self.preferences.list_resolved(candidate_id).await?;
        Ok(PreferredTitles {
            has_preferences: !rows.is_empty(),
            title_ids: dedup(rows.iter().filter_map(|r| r.job_title_id)),
        })
    }

    /// Entries parsing as UUIDs are looked up as canonical ids, the rest as titles.
    async fn resolve_override(&self, entries: &[String]) -> Result<PreferredTitles, AppError> {
        let mut ids = Vec::new();
        let mut titles = Vec::new();
        for entry in entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            match Uuid::parse_str(entry) {
                Ok(id) => ids.push(id),
                Err(_) => titles.push(entry.to_string()),
            }
        }
        let has_preferences = !ids.is_empty() || !titles.is_empty();

        let by_id = self.catalog.find_many_by_ids(&ids).await?;
        let by_title = self.catalog.find_many_by_titles(&titles).await?;
        Ok(PreferredTitles {
            has_preferences,
            title_ids: dedup(by_id.iter().chain(by_title.iter()).map(|t| t.id)),
        })
    }
}

fn dedup(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// Orders jobs by fitness score, highest first. Equal scores keep their relative order.
pub fn sort_by_fitness(jobs: &mut [RelevantJob]) {
    jobs.sort_by(|a, b| b.score().cmp(&a.score()));
}
