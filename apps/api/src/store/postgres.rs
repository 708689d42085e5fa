use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::predicate::{Predicate, SalaryFilter, SalarySource};
use crate::models::posting::JobPostingRow;
use crate::models::title::JobTitleRow;
use crate::store::{CandidateProfileStore, PageRequest, PostingPage, PostingStore, TitleCatalog};

const POSTING_COLUMNS: &str = "p.id, p.agency_id, p.title, p.country, p.salary_amount, \
     p.salary_currency, p.skills, p.education_requirements, p.experience_requirements, \
     ARRAY(SELECT jpt.job_title_id FROM job_posting_titles jpt \
           WHERE jpt.job_posting_id = p.id ORDER BY jpt.job_title_id) AS title_ids, \
     p.created_at";

// ────────────────────────────────────────────────────────────────────────────
// Predicate compiler
// ────────────────────────────────────────────────────────────────────────────

/// Appends `predicate` as a boolean SQL expression over the `job_postings p` alias.
/// All user values are bound, never interpolated.
pub fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Always => {
            builder.push("TRUE");
        }
        Predicate::Never => {
            builder.push("FALSE");
        }
        Predicate::TitleIdsAny(ids) => {
            builder.push(
                "EXISTS (SELECT 1 FROM job_posting_titles jpt \
                 WHERE jpt.job_posting_id = p.id AND jpt.job_title_id = ANY(",
            );
            builder.push_bind(ids.clone());
            builder.push("))");
        }
        Predicate::SkillsOverlap(tags) => push_tag_overlap(builder, "p.skills", tags),
        Predicate::EducationOverlap(tags) => {
            push_tag_overlap(builder, "p.education_requirements", tags)
        }
        Predicate::CountryContains(needles) => {
            builder.push("(");
            for (i, needle) in needles.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push("p.country ILIKE ");
                builder.push_bind(format!("%{}%", escape_like(needle)));
            }
            builder.push(")");
        }
        Predicate::Salary(filter) => push_salary(builder, filter),
        Predicate::Any(children) => push_group(builder, children, " OR "),
        Predicate::All(children) => push_group(builder, children, " AND "),
    }
}

fn push_group(builder: &mut QueryBuilder<'_, Postgres>, children: &[Predicate], joiner: &str) {
    builder.push("(");
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            builder.push(joiner);
        }
        push_predicate(builder, child);
    }
    builder.push(")");
}

/// Tag columns are free-form JSONB; anything but an array counts as no tags.
fn push_tag_overlap(builder: &mut QueryBuilder<'_, Postgres>, column: &str, tags: &[String]) {
    builder.push(format!(
        "EXISTS (SELECT 1 FROM jsonb_array_elements_text(\
         CASE WHEN jsonb_typeof({column}) = 'array' THEN {column} ELSE '[]'::jsonb END\
         ) AS tag(value) WHERE lower(btrim(tag.value)) = ANY("
    ));
    builder.push_bind(tags.iter().map(|t| t.to_lowercase()).collect::<Vec<_>>());
    builder.push("))");
}

fn push_salary(builder: &mut QueryBuilder<'_, Postgres>, filter: &SalaryFilter) {
    match filter.source {
        SalarySource::Base => {
            builder.push("(p.salary_amount IS NOT NULL");
            if let Some(min) = filter.min {
                builder.push(" AND p.salary_amount >= ").push_bind(min);
            }
            if let Some(max) = filter.max {
                builder.push(" AND p.salary_amount <= ").push_bind(max);
            }
            if let Some(currency) = filter.currency() {
                builder
                    .push(" AND upper(p.salary_currency) = ")
                    .push_bind(currency);
            }
            builder.push(")");
        }
        SalarySource::Converted => {
            builder.push(
                "EXISTS (SELECT 1 FROM job_salary_conversions c WHERE c.job_posting_id = p.id",
            );
            // validate() guarantees a currency for converted lookups
            if let Some(currency) = filter.currency() {
                builder.push(" AND upper(c.currency) = ").push_bind(currency);
            }
            if let Some(min) = filter.min {
                builder.push(" AND c.amount >= ").push_bind(min);
            }
            if let Some(max) = filter.max {
                builder.push(" AND c.amount <= ").push_bind(max);
            }
            builder.push(")");
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Stores
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgPostingStore {
    pool: PgPool,
}

impl PgPostingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostingStore for PgPostingStore {
    #[instrument(skip(self, predicate))]
    async fn find_page(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> Result<PostingPage, AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM job_postings p WHERE ");
        push_predicate(&mut count, predicate);
        debug!(sql = count.sql(), "counting relevant postings");
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::new(format!("SELECT {POSTING_COLUMNS} FROM job_postings p WHERE "));
        push_predicate(&mut select, predicate);
        select
            .push(" ORDER BY p.created_at DESC, p.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select
            .build_query_as::<JobPostingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(PostingPage { rows, total })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobPostingRow>, AppError> {
        let sql = format!("SELECT {POSTING_COLUMNS} FROM job_postings p WHERE p.id = $1");
        Ok(sqlx::query_as::<_, JobPostingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[derive(Clone)]
pub struct PgTitleCatalog {
    pool: PgPool,
}

impl PgTitleCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TitleCatalog for PgTitleCatalog {
    async fn find_active_by_title(&self, title: &str) -> Result<Option<JobTitleRow>, AppError> {
        Ok(sqlx::query_as::<_, JobTitleRow>(
            "SELECT id, title, is_active FROM job_titles \
             WHERE lower(title) = lower($1) AND is_active ORDER BY id LIMIT 1",
        )
        .bind(title.trim())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_many_by_ids(&self, ids: &[Uuid]) -> Result<Vec<JobTitleRow>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, JobTitleRow>(
            "SELECT id, title, is_active FROM job_titles WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_many_by_titles(&self, titles: &[String]) -> Result<Vec<JobTitleRow>, AppError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        let lowered: Vec<String> = titles.iter().map(|t| t.trim().to_lowercase()).collect();
        Ok(sqlx::query_as::<_, JobTitleRow>(
            "SELECT id, title, is_active FROM job_titles WHERE lower(title) = ANY($1)",
        )
        .bind(lowered)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[derive(Clone)]
pub struct PgCandidateProfileStore {
    pool: PgPool,
}

impl PgCandidateProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateProfileStore for PgCandidateProfileStore {
    async fn candidate_exists(&self, candidate_id: Uuid) -> Result<bool, AppError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM candidates WHERE id = $1)")
                .bind(candidate_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn most_recent_job_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<Value>, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT profile FROM candidate_job_profiles \
             WHERE candidate_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
