use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::preference::CandidatePreferenceRow;

/// An edit applied to a candidate's full preference set.
pub type PreferenceEdit =
    Box<dyn FnOnce(&mut Vec<CandidatePreferenceRow>) -> Result<(), AppError> + Send>;

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Preferences of `candidate_id` ordered by priority. Unknown candidate → `NotFound`.
    async fn list(&self, candidate_id: Uuid) -> Result<Vec<CandidatePreferenceRow>, AppError>;

    /// Loads the candidate's full set, runs `edit`, and persists the result atomically.
    /// If `edit` fails nothing is written.
    async fn update(
        &self,
        candidate_id: Uuid,
        edit: PreferenceEdit,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError>;
}

#[derive(Clone)]
pub struct PgPreferenceRepository {
    pool: PgPool,
}

impl PgPreferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_PREFERENCES: &str = "SELECT id, candidate_id, title, priority, job_title_id, \
     created_at, updated_at FROM candidate_preferences WHERE candidate_id = $1 \
     ORDER BY priority ASC, updated_at DESC";

#[async_trait]
impl PreferenceRepository for PgPreferenceRepository {
    async fn list(&self, candidate_id: Uuid) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM candidates WHERE id = $1)")
                .bind(candidate_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(candidate_not_found(candidate_id));
        }

        Ok(sqlx::query_as::<_, CandidatePreferenceRow>(SELECT_PREFERENCES)
            .bind(candidate_id)
            .fetch_all(&self.pool)
            .await?)
    }

    #[instrument(skip(self, edit))]
    async fn update(
        &self,
        candidate_id: Uuid,
        edit: PreferenceEdit,
    ) -> Result<Vec<CandidatePreferenceRow>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Locking the candidate row serializes concurrent edits even when the set is empty.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM candidates WHERE id = $1 FOR UPDATE")
                .bind(candidate_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(candidate_not_found(candidate_id));
        }

        let before = sqlx::query_as::<_, CandidatePreferenceRow>(SELECT_PREFERENCES)
            .bind(candidate_id)
            .fetch_all(&mut *tx)
            .await?;

        let mut after = before.clone();
        edit(&mut after)?;

        let written = persist_diff(&mut tx, &before, &after).await?;
        tx.commit().await?;

        if written > 0 {
            info!("Updated {written} preference rows for candidate {candidate_id}");
        }
        Ok(after)
    }
}

/// Writes only the rows that differ between `before` and `after`.
async fn persist_diff(
    tx: &mut Transaction<'_, Postgres>,
    before: &[CandidatePreferenceRow],
    after: &[CandidatePreferenceRow],
) -> Result<usize, AppError> {
    let old: HashMap<Uuid, &CandidatePreferenceRow> = before.iter().map(|r| (r.id, r)).collect();
    let kept: Vec<Uuid> = after.iter().map(|r| r.id).collect();
    let mut written = 0;

    let removed: Vec<Uuid> = before
        .iter()
        .map(|r| r.id)
        .filter(|id| !kept.contains(id))
        .collect();
    if !removed.is_empty() {
        written += sqlx::query("DELETE FROM candidate_preferences WHERE id = ANY($1)")
            .bind(&removed)
            .execute(&mut **tx)
            .await?
            .rows_affected() as usize;
    }

    for row in after {
        match old.get(&row.id) {
            Some(previous) if *previous == row => {}
            Some(_) => {
                sqlx::query(
                    "UPDATE candidate_preferences \
                     SET priority = $1, job_title_id = $2, updated_at = $3 WHERE id = $4",
                )
                .bind(row.priority)
                .bind(row.job_title_id)
                .bind(row.updated_at)
                .bind(row.id)
                .execute(&mut **tx)
                .await?;
                written += 1;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO candidate_preferences
                        (id, candidate_id, title, priority, job_title_id, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(row.id)
                .bind(row.candidate_id)
                .bind(&row.title)
                .bind(row.priority)
                .bind(row.job_title_id)
                .bind(row.created_at)
                .bind(row.updated_at)
                .execute(&mut **tx)
                .await?;
                written += 1;
            }
        }
    }

    Ok(written)
}

fn candidate_not_found(candidate_id: Uuid) -> AppError {
    AppError::NotFound(format!("Candidate {candidate_id} not found"))
}
