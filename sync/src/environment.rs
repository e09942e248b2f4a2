//! Injected dependencies of the reducer's effects.

use crate::cache::{DEFAULT_CACHE_KEY, LocalCache};
use crate::gateway::RemoteGateway;
use crate::orchestrator::LoadOrchestrator;
use std::sync::Arc;

/// Environment for [`AppReducer`](crate::reducer::AppReducer)
///
/// Holds the local cache and the remote gateway behind trait objects so tests
/// can substitute in-memory implementations.
#[derive(Clone)]
pub struct AppEnvironment {
    /// Local persistent cache
    pub cache: Arc<dyn LocalCache>,
    /// Remote user-data gateway
    pub gateway: Arc<dyn RemoteGateway>,
    /// Key the snapshot is stored under
    pub cache_key: String,
}

impl AppEnvironment {
    /// Create an environment using [`DEFAULT_CACHE_KEY`]
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>, gateway: Arc<dyn RemoteGateway>) -> Self {
        Self {
            cache,
            gateway,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
        }
    }

    /// Store the snapshot under `key` instead of the default
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    /// Orchestrator over this environment's collaborators
    #[must_use]
    pub fn orchestrator(&self) -> LoadOrchestrator {
        LoadOrchestrator::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.gateway),
            self.cache_key.clone(),
        )
    }
}

impl std::fmt::Debug for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppEnvironment")
            .field("cache_key", &self.cache_key)
            .finish_non_exhaustive()
    }
}
