//! In-memory collaborators for unit tests. They mirror the Postgres stores' semantics.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::config::{Config, MatchingConfig};
use crate::errors::AppError;
use crate::matching::predicate::{Predicate, SalaryFilter, SalarySource};
use crate::matching::relevance::RelevanceEngine;
use crate::models::posting::JobPostingRow;
use crate::models::preference::CandidatePreferenceRow;
use crate::models::title::JobTitleRow;
use crate::preferences::ordering::title_key;
use crate::preferences::repository::{PreferenceEdit, PreferenceRepository};
use crate::preferences::PreferenceStore;
use crate::state::AppState;
use crate::store::{CandidateProfileStore, PageRequest, PostingPage, PostingStore, TitleCatalog};

pub fn posting_with_tags(
    skills: Option<Value>,
    education: Option<Value>,
    experience: Option<Value>,
) -> JobPostingRow {
    JobPostingRow {
        id: Uuid::new_v4(),
        agency_id: None,
        title: "Site Electrician".to_string(),
        country: Some("Qatar".to_string()),
        salary_amount: None,
        salary_currency: None,
        skills,
        education_requirements: education,
        experience_requirements: experience,
        title_ids: vec![],
        created_at: Utc::now(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postings
// ────────────────────────────────────────────────────────────────────────────

/// A row of `job_salary_conversions`.
struct SalaryConversion {
    job_posting_id: Uuid,
    currency: String,
    amount: f64,
}

#[derive(Default)]
pub struct MemoryPostingStore {
    postings: Mutex<Vec<JobPostingRow>>,
    conversions: Mutex<Vec<SalaryConversion>>,
}

impl MemoryPostingStore {
    pub fn insert(&self, posting: JobPostingRow) {
        self.postings.lock().unwrap().push(posting);
    }

    pub fn insert_conversion(&self, job_posting_id: Uuid, currency: &str, amount: f64) {
        self.conversions.lock().unwrap().push(SalaryConversion {
            job_posting_id,
            currency: currency.to_string(),
            amount,
        });
    }

    fn matches(&self, predicate: &Predicate, posting: &JobPostingRow) -> bool {
        match predicate {
            Predicate::Always => true,
            Predicate::Never => false,
            Predicate::TitleIdsAny(ids) => posting.title_ids.iter().any(|id| ids.contains(id)),
            Predicate::SkillsOverlap(tags) => tags_overlap(posting.skills.as_ref(), tags),
            Predicate::EducationOverlap(tags) => {
                tags_overlap(posting.education_requirements.as_ref(), tags)
            }
            Predicate::CountryContains(needles) => posting.country.as_deref().is_some_and(|c| {
                let country = c.to_lowercase();
                needles.iter().any(|n| country.contains(&n.to_lowercase()))
            }),
            Predicate::Salary(filter) => self.salary_matches(filter, posting),
            Predicate::Any(children) => children.iter().any(|c| self.matches(c, posting)),
            Predicate::All(children) => children.iter().all(|c| self.matches(c, posting)),
        }
    }

    fn salary_matches(&self, filter: &SalaryFilter, posting: &JobPostingRow) -> bool {
        let in_range = |amount: f64| {
            filter.min.map_or(true, |min| amount >= min) && filter.max.map_or(true, |max| amount <= max)
        };
        let currency = filter.currency();
        match filter.source {
            SalarySource::Base => posting.salary_amount.is_some_and(|amount| {
                in_range(amount)
                    && currency.as_deref().map_or(true, |c| {
                        posting.salary_currency.as_deref().map(str::to_ascii_uppercase).as_deref() == Some(c)
                    })
            }),
            SalarySource::Converted => self.conversions.lock().unwrap().iter().any(|conv| {
                conv.job_posting_id == posting.id
                    && currency.as_deref() == Some(conv.currency.to_ascii_uppercase().as_str())
                    && in_range(conv.amount)
            }),
        }
    }
}

fn tags_overlap(field: Option<&Value>, tags: &[String]) -> bool {
    match field {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| tags.contains(&s.trim().to_lowercase())),
        _ => false,
    }
}

#[async_trait]
impl PostingStore for MemoryPostingStore {
    async fn find_page(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> Result<PostingPage, AppError> {
        let mut matching: Vec<JobPostingRow> = self
            .postings
            .lock()
            .unwrap()
            .iter()
            .filter(|p| self.matches(predicate, p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = matching.len() as i64;
        let rows = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(PostingPage { rows, total })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobPostingRow>, AppError> {
        Ok(self.postings.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog and profiles
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryTitleCatalog {
    titles: Mutex<Vec<JobTitleRow>>,
}

impl MemoryTitleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(self, title: &str, is_active: bool) -> Self {
        self.insert(title, is_active);
        self
    }

    pub fn insert(&self, title: &str, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.titles.lock().unwrap().push(JobTitleRow {
            id,
            title: title.to_string(),
            is_active,
        });
        id
    }
}

#[async_trait]
impl TitleCatalog for MemoryTitleCatalog {
    async fn find_active_by_title(&self, title: &str) -> Result<Option<JobTitleRow>, AppError> {
        let key = title_key(title);
        Ok(self
            .titles
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.is_active && title_key(&t.title) == key)
            .cloned())
    }

    async fn find_many_by_ids(&self, ids: &[Uuid]) -> Result<Vec<JobTitleRow>, AppError> {
        Ok(self
            .titles
            .lock()
            .unwrap()
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn find_many_by_titles(&self, titles: &[String]) -> Result<Vec<JobTitleRow>, AppError> {
        let keys: HashSet<String> = titles.iter().map(|t| title_key(t)).collect();
        Ok(self
            .titles
            .lock()
            .unwrap()
            .iter()
            .filter(|t| keys.contains(&title_key(&t.title)))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, Option<Value>>>,
}

impl MemoryProfileStore {
    pub fn insert(&self, candidate_id: Uuid, blob: Option<Value>) {
        self.profiles.lock().unwrap().insert(candidate_id, blob);
    }
}

#[async_trait]
impl CandidateProfileStore for MemoryProfileStore {
    async fn candidate_exists(&self, candidate_id: Uuid) -> Result<bool, AppError> {
        Ok(self.profiles.lock().unwrap().contains_key(&candidate_id))
    }

    async fn most_recent_job_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<Value>, AppError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(&candidate_id)
            .cloned()
            .flatten())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Preferences
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryPreferenceRepository {
    sets: Mutex<HashMap<Uuid, Vec<CandidatePreferenceRow>>>,
}

impl MemoryPreferenceRepository {
    pub fn with_candidates(candidates: &[Uuid]) -> Self {
        let repo = Self::default();
        for candidate in candidates {
            repo.add_candidate(*candidate);
        }
        repo
    }

    pub fn add_candidate(&self, candidate_id: Uuid) {
        self.sets.lock().unwrap().entry(candidate_id).or_default();
    }

    /// Inserts a row without a canonical id, as older data has.
    pub fn insert_legacy(&self, candidate_id: Uuid, title: &str, priority: i32) {
        let at = Utc::now() - Duration::days(30);
        self.sets
            .lock()
            .unwrap()
            .entry(candidate_id)
            .or_default()
            .push(CandidatePreferenceRow {
                id: Uuid::new_v4(),
                candidate_id,
                title: title.to_string(),
                priority,
                job_title_id: None,
                created_at: at,
                updated_at: at,
            });
    }
}

fn not_found(candidate_id: Uuid) -> AppError {
    AppError::NotFound(format!("Candidate {candidate_id} not found"))
}

#[async_trait]
impl PreferenceRepository for MemoryPreferenceRepository {
    async fn list(&self, candidate_id: Uuid) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        let sets = self.sets.lock().unwrap();
        let mut rows = sets.get(&candidate_id).cloned().ok_or_else(|| not_found(candidate_id))?;
        rows.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| b.updated_at.cmp(&a.updated_at)));
        Ok(rows)
    }

    async fn update(
        &self,
        candidate_id: Uuid,
        edit: PreferenceEdit,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        let mut sets = self.sets.lock().unwrap();
        let current = sets.get_mut(&candidate_id).ok_or_else(|| not_found(candidate_id))?;
        let mut working = current.clone();
        working.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| b.updated_at.cmp(&a.updated_at)));
        edit(&mut working)?;
        *current = working.clone();
        Ok(working)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine fixture
// ────────────────────────────────────────────────────────────────────────────

pub struct EngineFixture {
    pub engine: RelevanceEngine,
    pub postings: Arc<MemoryPostingStore>,
    pub catalog: Arc<MemoryTitleCatalog>,
    pub profiles: Arc<MemoryProfileStore>,
    pub preference_repo: Arc<MemoryPreferenceRepository>,
}

impl EngineFixture {
    pub fn new() -> Self {
        let postings = Arc::new(MemoryPostingStore::default());
        let catalog = Arc::new(MemoryTitleCatalog::new());
        let profiles = Arc::new(MemoryProfileStore::default());
        let preference_repo = Arc::new(MemoryPreferenceRepository::default());
        let preferences = PreferenceStore::new(preference_repo.clone(), catalog.clone());
        let engine = RelevanceEngine::new(
            postings.clone(),
            catalog.clone(),
            profiles.clone(),
            preferences,
            MatchingConfig::default(),
        );
        Self {
            engine,
            postings,
            catalog,
            profiles,
            preference_repo,
        }
    }

    pub fn add_title(&self, title: &str) -> Uuid {
        self.catalog.insert(title, true)
    }

    pub fn add_posting(&self, posting: JobPostingRow) -> Uuid {
        let id = posting.id;
        self.postings.insert(posting);
        id
    }

    pub fn add_posting_with_titles(&self, posting: JobPostingRow, title_ids: &[Uuid]) -> Uuid {
        self.add_posting(JobPostingRow {
            title_ids: title_ids.to_vec(),
            ..posting
        })
    }

    pub fn add_candidate(&self, blob: Option<Value>) -> Uuid {
        let candidate_id = Uuid::new_v4();
        self.profiles.insert(candidate_id, blob);
        self.preference_repo.add_candidate(candidate_id);
        candidate_id
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            config: Config {
                database_url: "postgres://localhost/jobmatch_test".to_string(),
                port: 0,
                rust_log: "debug".to_string(),
                db_max_connections: 1,
                matching: MatchingConfig::default(),
            },
            preferences: self.engine.preferences.clone(),
            relevance: self.engine.clone(),
        }
    }
}
