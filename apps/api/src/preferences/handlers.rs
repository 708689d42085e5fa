use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::preference::CandidatePreferenceRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PreferenceListResponse {
    pub preferences: Vec<CandidatePreferenceRow>,
}

impl From<Vec<CandidatePreferenceRow>> for PreferenceListResponse {
    fn from(preferences: Vec<CandidatePreferenceRow>) -> Self {
        Self { preferences }
    }
}

#[derive(Debug, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub title: String,
}

/// Either a full ordering of preference ids or of titles.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReorderRequest {
    Ids { ids: Vec<Uuid> },
    Titles { titles: Vec<String> },
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub resolved: usize,
}

/// GET /api/v1/candidates/:id/preferences
pub async fn handle_list_preferences(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<PreferenceListResponse>, AppError> {
    Ok(Json(state.preferences.list(candidate_id).await?.into()))
}

/// POST /api/v1/candidates/:id/preferences
pub async fn handle_add_preference(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(body): Json<TitleBody>,
) -> Result<Json<PreferenceListResponse>, AppError> {
    Ok(Json(state.preferences.add(candidate_id, &body.title).await?.into()))
}

/// DELETE /api/v1/candidates/:id/preferences?title=...
pub async fn handle_remove_preference(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<PreferenceListResponse>, AppError> {
    Ok(Json(state.preferences.remove(candidate_id, &query.title).await?.into()))
}

/// PUT /api/v1/candidates/:id/preferences/order
pub async fn handle_reorder_preferences(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<PreferenceListResponse>, AppError> {
    let rows = match body {
        ReorderRequest::Ids { ids } => state.preferences.reorder_by_ids(candidate_id, ids).await?,
        ReorderRequest::Titles { titles } => {
            state
                .preferences
                .reorder_by_titles(candidate_id, titles)
                .await?
        }
    };
    Ok(Json(rows.into()))
}

/// POST /api/v1/candidates/:id/preferences/backfill
pub async fn handle_backfill_preferences(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<BackfillResponse>, AppError> {
    let resolved = state.preferences.backfill_canonical_ids(candidate_id).await?;
    Ok(Json(BackfillResponse { resolved }))
}
