use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    models::pattern::PatternSummary,
    utils::{cache::TtlCache, notifier::Notifier},
};

/// Cached response of the popular patterns endpoint.
pub type PopularCache = TtlCache<Vec<PatternSummary>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub notifier: Notifier,
    pub popular: PopularCache,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Notifier {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}

impl FromRef<AppState> for PopularCache {
    fn from_ref(state: &AppState) -> Self {
        state.popular.clone()
    }
}
