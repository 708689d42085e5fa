use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::matching::relevance::RelevanceEngine;
use crate::preferences::repository::PgPreferenceRepository;
use crate::preferences::PreferenceStore;
use crate::store::postgres::{PgCandidateProfileStore, PgPostingStore, PgTitleCatalog};
use crate::store::TitleCatalog;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub preferences: PreferenceStore,
    /// Relevance queries and fitness scoring. Shares the title catalog with `preferences`.
    pub relevance: RelevanceEngine,
}

impl AppState {
    /// Wires every collaborator to the Postgres pool.
    pub fn postgres(config: Config, db: PgPool) -> Self {
        let catalog: Arc<dyn TitleCatalog> = Arc::new(PgTitleCatalog::new(db.clone()));
        let preferences = PreferenceStore::new(
            Arc::new(PgPreferenceRepository::new(db.clone())),
            catalog.clone(),
        );
        let relevance = RelevanceEngine::new(
            Arc::new(PgPostingStore::new(db.clone())),
            catalog,
            Arc::new(PgCandidateProfileStore::new(db)),
            preferences.clone(),
            config.matching,
        );
        Self {
            config,
            preferences,
            relevance,
        }
    }
}
