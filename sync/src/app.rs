//! Application wiring: store, environment and propagator in one place.

use crate::actions::AppAction;
use crate::cache::{FileCache, LocalCache};
use crate::config::SyncConfig;
use crate::environment::AppEnvironment;
use crate::error::{AppError, FlushTimeout};
use crate::gateway::{HttpGateway, RemoteGateway, StaticToken};
use crate::propagator::{ChangePropagator, SyncStats};
use crate::reducer::AppReducer;
use crate::state::AppState;
use pantry_runtime::{HealthReport, StateObserver, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// The store type collaborators receive
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

/// A store with the change propagator registered
///
/// Cloning yields another handle to the same store and propagator.
#[derive(Clone)]
pub struct App {
    store: AppStore,
    propagator: Arc<ChangePropagator>,
}

impl App {
    /// Assemble the application over the given collaborators
    ///
    /// Must be called from within a Tokio runtime. The initial load does not
    /// start until [`start`](Self::start) is called.
    #[must_use]
    pub fn new(
        cache: Arc<dyn LocalCache>,
        gateway: Arc<dyn RemoteGateway>,
        cache_key: impl Into<String>,
    ) -> Self {
        let environment =
            AppEnvironment::new(Arc::clone(&cache), Arc::clone(&gateway)).with_cache_key(cache_key);
        let propagator = ChangePropagator::spawn(cache, gateway, environment.cache_key.clone());

        let store = Store::new(AppState::default(), AppReducer::new(), environment);
        let observer: Arc<dyn StateObserver<AppState>> = propagator.clone();
        store.subscribe(observer);

        Self { store, propagator }
    }

    /// Assemble the application with a [`FileCache`] and an [`HttpGateway`]
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the configuration is invalid, the cache
    /// directory cannot be created, or the HTTP client cannot be built.
    pub fn from_config(config: &SyncConfig) -> Result<Self, AppError> {
        config.validate()?;

        let cache = FileCache::open(config.cache_dir.clone())?;
        let gateway = HttpGateway::new(
            config.user_data_url(),
            config.request_timeout(),
            Arc::new(StaticToken::from(config.api_token.clone())),
        )?;

        tracing::info!(
            url = gateway.url(),
            cache_dir = %cache.dir().display(),
            key = %config.cache_key,
            "Configured synchronization"
        );

        Ok(Self::new(
            Arc::new(cache),
            Arc::new(gateway),
            config.cache_key.clone(),
        ))
    }

    /// Run the initial load and wait until the seed has been applied
    ///
    /// Calling this again is harmless: the load runs at most once per store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn start(&self) -> Result<(), StoreError> {
        let mut handle = self.store.send(AppAction::Bootstrap).await?;
        handle.wait().await;
        Ok(())
    }

    /// The state owner, for dependency injection into collaborators
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// Send an action to the store
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn send(&self, action: AppAction) -> Result<(), StoreError> {
        self.store.send(action).await.map(|_| ())
    }

    /// Propagation counters
    #[must_use]
    pub fn sync_stats(&self) -> SyncStats {
        self.propagator.stats()
    }

    /// Wait for pending remote syncs
    ///
    /// # Errors
    ///
    /// Returns [`FlushTimeout`] if syncs are still pending after `timeout`.
    pub async fn flush(&self, timeout: Duration) -> Result<(), FlushTimeout> {
        self.propagator.flush(timeout).await
    }

    /// Combined health of the store and the propagator
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport::new(vec![self.store.health(), self.propagator.health()])
    }

    /// Stop accepting actions, then wait for effects and pending syncs
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if effects are still running or
    /// [`AppError::Flush`] if syncs are still pending after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), AppError> {
        self.store.shutdown(timeout).await?;
        self.propagator.flush(timeout).await?;
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("propagator", &self.propagator)
            .finish_non_exhaustive()
    }
}
