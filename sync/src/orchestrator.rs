//! Load Orchestrator
//!
//! Resolves the startup seed once per store: remote first, then the local
//! cache, then nothing. A remote seed is written back to the cache so the next
//! start can fall back to it.
//!
//! The orchestrator never fails. Every error is logged and the next source is
//! tried instead.

use crate::actions::LoadOutcome;
use crate::cache::{self, LocalCache};
use crate::gateway::RemoteGateway;
use crate::metrics as sync_metrics;
use crate::state::PartialSnapshot;
use std::sync::Arc;

/// Picks the startup seed
#[derive(Clone)]
pub struct LoadOrchestrator {
    cache: Arc<dyn LocalCache>,
    gateway: Arc<dyn RemoteGateway>,
    cache_key: String,
}

impl LoadOrchestrator {
    /// Create an orchestrator over the given collaborators
    #[must_use]
    pub fn new(
        cache: Arc<dyn LocalCache>,
        gateway: Arc<dyn RemoteGateway>,
        cache_key: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            gateway,
            cache_key: cache_key.into(),
        }
    }

    /// Resolve the seed in a single pass, without retries
    #[tracing::instrument(skip(self), fields(key = %self.cache_key))]
    pub async fn resolve_seed(&self) -> LoadOutcome {
        let outcome = match self.fetch_remote().await {
            Some(seed) => {
                self.persist_remote_seed(&seed);
                LoadOutcome::remote(seed)
            },
            None => self.read_local(),
        };

        metrics::counter!(sync_metrics::LOAD_SEED, "source" => outcome.source.as_str())
            .increment(1);
        tracing::info!(source = %outcome.source, "Resolved startup seed");

        outcome
    }

    async fn fetch_remote(&self) -> Option<PartialSnapshot> {
        match self.gateway.fetch_snapshot().await {
            Ok(Some(seed)) if !seed.is_empty() => Some(seed),
            Ok(_) => {
                tracing::info!("Remote holds no data");
                None
            },
            Err(error) => {
                tracing::warn!(%error, "Remote fetch failed, falling back to local cache");
                None
            },
        }
    }

    fn persist_remote_seed(&self, seed: &PartialSnapshot) {
        let written = serde_json::to_vec(seed)
            .map_err(crate::error::CacheError::from)
            .and_then(|bytes| self.cache.write(&self.cache_key, &bytes));

        if let Err(error) = written {
            tracing::warn!(%error, "Could not cache remote seed");
        }
    }

    fn read_local(&self) -> LoadOutcome {
        match cache::read_snapshot(self.cache.as_ref(), &self.cache_key) {
            Ok(Some(seed)) if !seed.is_empty() => LoadOutcome::local_cache(seed),
            Ok(_) => {
                tracing::debug!("Local cache is empty");
                LoadOutcome::empty()
            },
            Err(error) => {
                tracing::warn!(%error, "Local cache unreadable, starting empty");
                LoadOutcome::empty()
            },
        }
    }
}

impl std::fmt::Debug for LoadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOrchestrator")
            .field("cache_key", &self.cache_key)
            .finish_non_exhaustive()
    }
}
