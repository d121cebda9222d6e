//! Application state.

use std::sync::Arc;

use spendwatch_store::SqliteStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<SqliteStore>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<SqliteStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }
}
