//! Scriptable remote gateway.

use crate::error::GatewayError;
use crate::gateway::{GatewayFuture, RemoteGateway};
use crate::state::{PartialSnapshot, Snapshot};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    remote: Option<PartialSnapshot>,
    fail_fetch: bool,
    fail_replace: bool,
    fetch_delay: Duration,
    replace_delay: Duration,
    replaced: Vec<Snapshot>,
}

/// Mock remote gateway.
///
/// Fetch answers with the scripted remote snapshot (or no data). Replace calls
/// are recorded in completion order. Clones share the script and the record.
#[derive(Clone, Debug, Default)]
pub struct MockGateway {
    script: Arc<Mutex<Script>>,
    fetch_calls: Arc<AtomicUsize>,
    replace_calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockGateway {
    /// Create a gateway whose remote holds no data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer fetches with `snapshot`.
    #[must_use]
    pub fn with_remote(self, snapshot: PartialSnapshot) -> Self {
        self.script().remote = Some(snapshot);
        self
    }

    /// Fail every fetch with a transport error.
    #[must_use]
    pub fn with_failing_fetch(self) -> Self {
        self.script().fail_fetch = true;
        self
    }

    /// Delay every fetch.
    #[must_use]
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        self.script().fetch_delay = delay;
        self
    }

    /// Delay every replace.
    #[must_use]
    pub fn with_replace_delay(self, delay: Duration) -> Self {
        self.script().replace_delay = delay;
        self
    }

    /// Fail replaces until [`set_replace_failing(false)`](Self::set_replace_failing).
    #[must_use]
    pub fn with_failing_replace(self) -> Self {
        self.set_replace_failing(true);
        self
    }

    /// Toggle replace failures at runtime.
    pub fn set_replace_failing(&self, failing: bool) {
        self.script().fail_replace = failing;
    }

    /// Snapshots accepted so far, in completion order.
    #[must_use]
    pub fn replaced(&self) -> Vec<Snapshot> {
        self.script().replaced.clone()
    }

    /// Most recently accepted snapshot.
    #[must_use]
    pub fn last_replaced(&self) -> Option<Snapshot> {
        self.script().replaced.last().cloned()
    }

    /// Number of fetch calls.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of replace calls, failed ones included.
    #[must_use]
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// Highest number of replace calls that were running at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self) -> Result<Option<PartialSnapshot>, GatewayError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.script().fetch_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let script = self.script();
        if script.fail_fetch {
            return Err(GatewayError::RequestFailed("connection refused".to_string()));
        }
        Ok(script.remote.clone())
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<(), GatewayError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.script().replace_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut script = self.script();
            if script.fail_replace {
                Err(GatewayError::Status {
                    status: 503,
                    message: "service unavailable".to_string(),
                })
            } else {
                script.replaced.push(snapshot.clone());
                script.remote = Some(snapshot.clone().into());
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl RemoteGateway for MockGateway {
    fn fetch_snapshot(&self) -> GatewayFuture<'_, Option<PartialSnapshot>> {
        Box::pin(self.fetch())
    }

    fn replace_snapshot<'a>(&'a self, snapshot: &'a Snapshot) -> GatewayFuture<'a, ()> {
        Box::pin(self.replace(snapshot))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Product;

    #[tokio::test]
    async fn replace_updates_the_remote() {
        let gateway = MockGateway::new();
        assert_eq!(gateway.fetch_snapshot().await.unwrap(), None);

        let snapshot = Snapshot {
            products: vec![Product::new("p1", "Rice")],
            ..Snapshot::default()
        };
        gateway.replace_snapshot(&snapshot).await.unwrap();

        let fetched = gateway.fetch_snapshot().await.unwrap().unwrap();
        assert_eq!(fetched.products, Some(snapshot.products));
        assert_eq!(gateway.fetch_calls(), 2);
        assert_eq!(gateway.replace_calls(), 1);
    }

    #[tokio::test]
    async fn failing_replace_is_not_recorded() {
        let gateway = MockGateway::new().with_failing_replace();
        assert!(gateway.replace_snapshot(&Snapshot::default()).await.is_err());
        assert!(gateway.replaced().is_empty());

        gateway.set_replace_failing(false);
        gateway.replace_snapshot(&Snapshot::default()).await.unwrap();
        assert_eq!(gateway.replaced().len(), 1);
    }
}
