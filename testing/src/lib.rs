//! # Pantry Testing
//!
//! Testing utilities and helpers for the Pantry state synchronization core.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`assertions`]: Effect assertion helpers
//! - [`init_test_tracing`]: Opt-in log output for tests
//!
//! ## Example
//!
//! ```ignore
//! use pantry_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(AppReducer::new())
//!     .with_env(test_environment())
//!     .given_state(AppState::default())
//!     .when_action(AppAction::ToggleFavorite { id: "r1".into() })
//!     .then_state(|state| assert_eq!(state.favorites.len(), 1))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use reducer_test::{ReducerTest, assertions};

/// Install a `tracing` subscriber for test output
///
/// Honors `RUST_LOG`; safe to call from every test since repeated
/// installation attempts are ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
