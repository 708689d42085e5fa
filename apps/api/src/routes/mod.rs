pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::matching::handlers as matching;
use crate::preferences::handlers as preferences;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Relevance API
        .route(
            "/api/v1/candidates/:id/relevant-jobs",
            get(matching::handle_relevant_jobs),
        )
        .route(
            "/api/v1/candidates/:id/relevant-jobs/grouped",
            get(matching::handle_relevant_jobs_grouped),
        )
        .route(
            "/api/v1/candidates/:id/jobs/:job_id/fitness",
            get(matching::handle_job_fitness),
        )
        // Preference API
        .route(
            "/api/v1/candidates/:id/preferences",
            get(preferences::handle_list_preferences)
                .post(preferences::handle_add_preference)
                .delete(preferences::handle_remove_preference),
        )
        .route(
            "/api/v1/candidates/:id/preferences/order",
            put(preferences::handle_reorder_preferences),
        )
        .route(
            "/api/v1/candidates/:id/preferences/backfill",
            post(preferences::handle_backfill_preferences),
        )
        .with_state(state)
}
