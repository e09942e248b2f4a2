//! Metric descriptions for the store runtime.
//!
//! The runtime records through the `metrics` facade only. Applications that want
//! the numbers exported install a recorder of their choice and call
//! [`describe_metrics`] once so the exporter carries help text.

use metrics::{describe_counter, describe_histogram};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Total actions accepted by [`Store::send`](crate::Store::send).
pub const COMMANDS_TOTAL: &str = "store.commands.total";

/// Effects executed, labelled by `type`.
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";

/// Reducer wall time.
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";

/// Observer notifications delivered after a commit.
pub const OBSERVER_NOTIFICATIONS: &str = "store.observers.notified";

/// Actions rejected because the store is shutting down.
pub const SHUTDOWN_REJECTED: &str = "store.shutdown.rejected_actions";

/// Register descriptions for every store metric.
pub fn describe_metrics() {
    describe_counter!(COMMANDS_TOTAL, "Total number of actions sent to the store");
    describe_counter!(EFFECTS_EXECUTED, "Total number of effects executed, by type");
    describe_histogram!(REDUCER_DURATION, "Time taken to execute the reducer");
    describe_counter!(
        OBSERVER_NOTIFICATIONS,
        "Total number of observer notifications after committed transitions"
    );
    describe_counter!(
        SHUTDOWN_REJECTED,
        "Total number of actions rejected during shutdown"
    );
}
