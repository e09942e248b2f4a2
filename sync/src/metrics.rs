//! Metric names recorded by the load orchestrator and change propagator.

use metrics::{describe_counter, describe_gauge};

/// Startup seeds resolved, labelled by `source`.
pub const LOAD_SEED: &str = "load.seed";

/// Snapshots written to the local cache.
pub const LOCAL_WRITES: &str = "sync.local.writes";

/// Local cache writes that failed.
pub const LOCAL_FAILURES: &str = "sync.local.failures";

/// Snapshots accepted by the remote gateway.
pub const REMOTE_SYNCS: &str = "sync.remote.syncs";

/// Remote replace calls that failed.
pub const REMOTE_FAILURES: &str = "sync.remote.failures";

/// Snapshots replaced by a newer one before they were sent.
pub const REMOTE_SUPERSEDED: &str = "sync.remote.superseded";

/// Size in bytes of the last snapshot written to the cache.
pub const SNAPSHOT_BYTES: &str = "sync.snapshot.bytes";

/// Register descriptions for every sync metric, plus the store's.
pub fn describe_metrics() {
    pantry_runtime::metrics::describe_metrics();

    describe_counter!(LOAD_SEED, "Startup seeds resolved, by source");
    describe_counter!(LOCAL_WRITES, "Snapshots written to the local cache");
    describe_counter!(LOCAL_FAILURES, "Local cache writes that failed");
    describe_counter!(REMOTE_SYNCS, "Snapshots accepted by the remote gateway");
    describe_counter!(REMOTE_FAILURES, "Remote replace calls that failed");
    describe_counter!(
        REMOTE_SUPERSEDED,
        "Snapshots superseded by a newer one before being sent"
    );
    describe_gauge!(SNAPSHOT_BYTES, "Size of the last cached snapshot in bytes");
}
