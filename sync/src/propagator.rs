//! Change Propagator
//!
//! A [`StateObserver`] that keeps the local cache and the remote copy in step
//! with the store once the initial load has completed.
//!
//! Every committed change to the persisted subset is:
//!
//! 1. written to the local cache synchronously, before `send` returns
//! 2. handed to a background worker that replaces the remote snapshot
//!
//! The worker keeps at most one replace call in flight. Snapshots that arrive
//! while a call is running overwrite each other in a depth-1 slot and only the
//! newest is sent next, so remote completion order always matches the order
//! changes were committed.

use crate::cache::{self, LocalCache};
use crate::error::FlushTimeout;
use crate::gateway::RemoteGateway;
use crate::metrics as sync_metrics;
use crate::state::{AppState, Snapshot};
use pantry_runtime::{HealthCheck, StateObserver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Counters describing propagation so far
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Snapshots written to the local cache
    pub local_writes: u64,
    /// Local cache writes that failed
    pub local_write_failures: u64,
    /// Snapshots accepted by the remote
    pub remote_syncs: u64,
    /// Remote replace calls that failed
    pub remote_failures: u64,
    /// Snapshots superseded before being sent
    pub superseded: u64,
    /// Most recent local or remote failure
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct SyncStatus {
    stats: SyncStats,
    local_ok: bool,
    remote_ok: bool,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            stats: SyncStats::default(),
            local_ok: true,
            remote_ok: true,
        }
    }
}

type SharedStatus = Arc<Mutex<SyncStatus>>;

fn lock_status(status: &SharedStatus) -> MutexGuard<'_, SyncStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot waiting in the depth-1 slot
#[derive(Clone, Debug)]
struct Pending {
    sequence: u64,
    snapshot: Arc<Snapshot>,
}

/// Observer that writes through to the cache and syncs to the remote
pub struct ChangePropagator {
    cache: Arc<dyn LocalCache>,
    cache_key: String,
    last_propagated: Mutex<Option<Snapshot>>,
    sequence: AtomicU64,
    slot: watch::Sender<Option<Pending>>,
    attempted: watch::Receiver<u64>,
    status: SharedStatus,
}

impl ChangePropagator {
    /// Create the propagator and start its remote sync worker
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(
        cache: Arc<dyn LocalCache>,
        gateway: Arc<dyn RemoteGateway>,
        cache_key: impl Into<String>,
    ) -> Arc<Self> {
        let (slot, pending) = watch::channel(None);
        let (attempted_tx, attempted) = watch::channel(0);
        let status = SharedStatus::default();

        let worker = RemoteSyncWorker {
            gateway,
            pending,
            attempted: attempted_tx,
            status: Arc::clone(&status),
        };
        tokio::spawn(worker.run());

        Arc::new(Self {
            cache,
            cache_key: cache_key.into(),
            last_propagated: Mutex::new(None),
            sequence: AtomicU64::new(0),
            slot,
            attempted,
            status,
        })
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        lock_status(&self.status).stats.clone()
    }

    /// Snapshots enqueued for the remote but not yet attempted
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.sequence
            .load(Ordering::SeqCst)
            .saturating_sub(*self.attempted.borrow())
    }

    /// Wait until every snapshot enqueued so far has been attempted
    ///
    /// Superseded snapshots count as attempted once a newer one has been sent.
    ///
    /// # Errors
    ///
    /// Returns [`FlushTimeout`] if the worker is still busy after `timeout`.
    pub async fn flush(&self, timeout: Duration) -> Result<(), FlushTimeout> {
        let target = self.sequence.load(Ordering::SeqCst);
        let mut attempted = self.attempted.clone();

        match tokio::time::timeout(timeout, attempted.wait_for(|done| *done >= target)).await {
            // A closed channel means the worker is gone; nothing more will be sent.
            Ok(_) => Ok(()),
            Err(_) => Err(FlushTimeout {
                pending: self.pending(),
            }),
        }
    }

    /// Degraded while the most recent local write or remote sync has failed
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        let (stats, local_ok, remote_ok) = {
            let status = lock_status(&self.status);
            (status.stats.clone(), status.local_ok, status.remote_ok)
        };

        let check = match (local_ok, remote_ok) {
            (true, true) => HealthCheck::healthy("sync"),
            (false, _) => HealthCheck::degraded("sync", "last local cache write failed"),
            (true, false) => HealthCheck::degraded("sync", "last remote sync failed"),
        };

        check
            .with_detail("local_writes", stats.local_writes)
            .with_detail("remote_syncs", stats.remote_syncs)
            .with_detail("pending", self.pending())
    }

    fn write_local(&self, snapshot: &Snapshot) {
        let result = cache::write_snapshot(self.cache.as_ref(), &self.cache_key, snapshot);
        let mut status = lock_status(&self.status);

        match result {
            Ok(bytes) => {
                status.stats.local_writes += 1;
                status.local_ok = true;
                metrics::counter!(sync_metrics::LOCAL_WRITES).increment(1);
                #[allow(clippy::cast_precision_loss)] // Snapshot sizes stay far below 2^52
                let size = bytes as f64;
                metrics::gauge!(sync_metrics::SNAPSHOT_BYTES).set(size);
                tracing::trace!(key = %self.cache_key, bytes, "Wrote snapshot to local cache");
            },
            Err(error) => {
                status.stats.local_write_failures += 1;
                status.stats.last_error = Some(error.to_string());
                status.local_ok = false;
                metrics::counter!(sync_metrics::LOCAL_FAILURES).increment(1);
                tracing::warn!(key = %self.cache_key, %error, "Local cache write failed");
            },
        }
    }

    fn enqueue_remote(&self, snapshot: Snapshot) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(sequence, "Enqueued snapshot for remote sync");

        self.slot.send_replace(Some(Pending {
            sequence,
            snapshot: Arc::new(snapshot),
        }));
    }
}

impl StateObserver<AppState> for ChangePropagator {
    fn state_changed(&self, state: &AppState) {
        if !state.is_ready() {
            return;
        }

        let snapshot = {
            let mut last = self
                .last_propagated
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if last.is_none() && !state.edited_during_load {
                *last = Some(state.snapshot());
                tracing::debug!("Recorded post-load baseline");
                return;
            }
            if last.as_ref().is_some_and(|previous| state.persisted_eq(previous)) {
                return;
            }

            let snapshot = state.snapshot();
            *last = Some(snapshot.clone());
            snapshot
        };

        self.write_local(&snapshot);
        self.enqueue_remote(snapshot);
    }
}

impl std::fmt::Debug for ChangePropagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangePropagator")
            .field("cache_key", &self.cache_key)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Background task sending the newest pending snapshot to the remote
struct RemoteSyncWorker {
    gateway: Arc<dyn RemoteGateway>,
    pending: watch::Receiver<Option<Pending>>,
    attempted: watch::Sender<u64>,
    status: SharedStatus,
}

impl RemoteSyncWorker {
    async fn run(mut self) {
        let mut last_sent = 0_u64;

        // Ends when the propagator, and with it the sending half, is dropped.
        while self.pending.changed().await.is_ok() {
            let next = self.pending.borrow_and_update().clone();
            let Some(pending) = next else {
                continue;
            };
            if pending.sequence <= last_sent {
                continue;
            }

            let superseded = pending.sequence - last_sent - 1;
            if superseded > 0 {
                lock_status(&self.status).stats.superseded += superseded;
                metrics::counter!(sync_metrics::REMOTE_SUPERSEDED).increment(superseded);
                tracing::debug!(sequence = pending.sequence, superseded, "Coalesced snapshots");
            }

            self.send(&pending).await;

            last_sent = pending.sequence;
            self.attempted.send_replace(last_sent);
        }

        tracing::debug!("Remote sync worker stopped");
    }

    async fn send(&self, pending: &Pending) {
        let result = self.gateway.replace_snapshot(&pending.snapshot).await;
        let mut status = lock_status(&self.status);

        match result {
            Ok(()) => {
                status.stats.remote_syncs += 1;
                status.remote_ok = true;
                metrics::counter!(sync_metrics::REMOTE_SYNCS).increment(1);
                tracing::debug!(sequence = pending.sequence, "Remote snapshot replaced");
            },
            Err(error) => {
                status.stats.remote_failures += 1;
                status.stats.last_error = Some(error.to_string());
                status.remote_ok = false;
                metrics::counter!(sync_metrics::REMOTE_FAILURES).increment(1);
                tracing::warn!(sequence = pending.sequence, %error, "Remote sync failed");
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_CACHE_KEY, MemoryCache};
    use crate::mocks::MockGateway;
    use crate::model::{CartEntry, EntityId, Product};
    use crate::state::LoadPhase;

    fn ready_state() -> AppState {
        AppState {
            load_phase: LoadPhase::Completed,
            ..AppState::default()
        }
    }

    fn propagator(cache: &MemoryCache, gateway: &MockGateway) -> Arc<ChangePropagator> {
        ChangePropagator::spawn(
            Arc::new(cache.clone()),
            Arc::new(gateway.clone()),
            DEFAULT_CACHE_KEY,
        )
    }

    #[tokio::test]
    async fn ignores_commits_before_the_load_completes() {
        let cache = MemoryCache::new();
        let gateway = MockGateway::new();
        let propagator = propagator(&cache, &gateway);

        let mut state = AppState {
            products: vec![Product::new("p1", "Rice")],
            ..AppState::default()
        };
        propagator.state_changed(&state);
        state.load_phase = LoadPhase::Completed;
        state.loading = true;
        propagator.state_changed(&state);

        propagator.flush(Duration::from_secs(1)).await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(gateway.replace_calls(), 0);
    }

    #[tokio::test]
    async fn first_ready_commit_is_only_a_baseline() {
        let cache = MemoryCache::new();
        let gateway = MockGateway::new();
        let propagator = propagator(&cache, &gateway);

        let mut state = ready_state();
        state.products.push(Product::new("p1", "Rice"));
        propagator.state_changed(&state);
        propagator.state_changed(&state);

        propagator.flush(Duration::from_secs(1)).await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(propagator.stats(), SyncStats::default());
    }

    #[tokio::test]
    async fn edits_during_load_propagate_immediately() {
        let cache = MemoryCache::new();
        let gateway = MockGateway::new();
        let propagator = propagator(&cache, &gateway);

        let mut state = ready_state();
        state.edited_during_load = true;
        state.favorites.push(EntityId::from("p1"));
        propagator.state_changed(&state);

        propagator.flush(Duration::from_secs(1)).await.unwrap();
        assert_eq!(propagator.stats().local_writes, 1);
        assert_eq!(gateway.replaced(), vec![state.snapshot()]);
    }

    #[tokio::test]
    async fn writes_changes_through_and_skips_flag_only_commits() {
        let cache = MemoryCache::new();
        let gateway = MockGateway::new();
        let propagator = propagator(&cache, &gateway);

        let mut state = ready_state();
        propagator.state_changed(&state);

        state.cart.push(CartEntry::new("p1", 2));
        propagator.state_changed(&state);
        state.error = Some("offline".into());
        propagator.state_changed(&state);

        propagator.flush(Duration::from_secs(1)).await.unwrap();

        let cached = cache::read_snapshot(&cache, DEFAULT_CACHE_KEY).unwrap().unwrap();
        assert_eq!(cached.cart, Some(state.cart.clone()));
        assert_eq!(propagator.stats().local_writes, 1);
        assert_eq!(gateway.replace_calls(), 1);
        assert!(propagator.health().status.is_healthy());
    }

    #[tokio::test]
    async fn coalesces_while_a_sync_is_in_flight() {
        let cache = MemoryCache::new();
        let gateway = MockGateway::new().with_replace_delay(Duration::from_millis(100));
        let propagator = propagator(&cache, &gateway);

        let mut state = ready_state();
        propagator.state_changed(&state);

        for quantity in 1..=5 {
            state.cart = vec![CartEntry::new("p1", quantity)];
            propagator.state_changed(&state);
            tokio::task::yield_now().await;
        }

        propagator.flush(Duration::from_secs(5)).await.unwrap();

        let replaced = gateway.replaced();
        assert!(replaced.len() < 5, "expected coalescing, got {} syncs", replaced.len());
        assert_eq!(replaced.last().unwrap().cart, vec![CartEntry::new("p1", 5)]);
        assert_eq!(gateway.max_in_flight(), 1);

        let stats = propagator.stats();
        assert_eq!(stats.local_writes, 5);
        assert_eq!(stats.remote_syncs + stats.superseded, 5);
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() {
        let cache = MemoryCache::new().with_quota(8);
        let gateway = MockGateway::new().with_failing_replace();
        let propagator = propagator(&cache, &gateway);

        let mut state = ready_state();
        propagator.state_changed(&state);
        state.products.push(Product::new("p1", "Rice"));
        propagator.state_changed(&state);

        propagator.flush(Duration::from_secs(1)).await.unwrap();

        let stats = propagator.stats();
        assert_eq!(stats.local_write_failures, 1);
        assert_eq!(stats.remote_failures, 1);
        assert!(stats.last_error.is_some());
        assert!(propagator.health().status.is_degraded());
    }

    #[tokio::test]
    async fn flush_times_out_on_a_stuck_remote() {
        let gateway = MockGateway::new().with_replace_delay(Duration::from_secs(10));
        let propagator = propagator(&MemoryCache::new(), &gateway);

        let mut state = ready_state();
        propagator.state_changed(&state);
        state.favorites.push(EntityId::from("p1"));
        propagator.state_changed(&state);

        let err = propagator.flush(Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(err.pending, 1);
    }
}
