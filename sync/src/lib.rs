//! # Pantry Sync
//!
//! State synchronization core of the Pantry grocery and meal-planning app.
//!
//! The application state (products, shopping lists, recipes, meal plans,
//! expenses, cart and favorites) lives in a single [`Store`](pantry_runtime::Store).
//! This crate supplies everything around it:
//!
//! - [`reducer`]: pure transitions for every mutation the app performs
//! - [`orchestrator`]: picks the startup seed (remote, then local cache, then empty)
//! - [`propagator`]: writes every committed change through to the local cache
//!   and keeps the remote copy eventually consistent
//! - [`cache`]: the persistent local key/value cache
//! - [`gateway`]: fetch and replace of the remote snapshot
//!
//! ## Example
//!
//! ```ignore
//! use pantry_sync::{App, AppAction, SyncConfig};
//! use pantry_sync::model::Product;
//!
//! let app = App::from_config(&SyncConfig::from_env()?)?;
//! app.start().await?;
//!
//! app.send(AppAction::AddProduct(Product::new("p1", "Rice"))).await?;
//! let count = app.store().state(|s| s.products.len()).await;
//! ```

pub mod actions;
pub mod app;
pub mod cache;
pub mod config;
mod decode;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod propagator;
pub mod reducer;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use actions::{AppAction, LoadOutcome, SeedSource};
pub use app::{App, AppStore};
pub use cache::{FileCache, LocalCache, MemoryCache};
pub use config::SyncConfig;
pub use environment::AppEnvironment;
pub use error::{AppError, CacheError, ConfigError, FlushTimeout, GatewayError};
pub use gateway::{HttpGateway, RemoteGateway, StaticToken, TokenProvider};
pub use orchestrator::LoadOrchestrator;
pub use propagator::{ChangePropagator, SyncStats};
pub use reducer::AppReducer;
pub use state::{AppState, LoadPhase, PartialSnapshot, Snapshot};
