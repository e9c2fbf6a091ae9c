//! Latest-request-wins guard for overlapping fetches.
//!
//! Many logically-overlapping asynchronous fetches may target one shared
//! piece of state (the resource snapshot). The guard issues a monotonic
//! epoch token per fetch; only the outcome of the most recently issued
//! fetch is applied, regardless of completion order. Relying on completion
//! order instead is wrong under network jitter: a stale request can finish
//! after a newer one. Token comparison is race-free.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Token identifying one guarded request.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestEpoch(u64);

impl fmt::Debug for RequestEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epoch({})", self.0)
    }
}

/// Per-resource monotonic token issuer.
///
/// Cheaply cloneable; clones share the same counter, so the teardown path
/// can invalidate in-flight requests from another thread.
#[derive(Clone, Debug, Default)]
pub struct RequestGuard {
    epoch: Arc<AtomicU64>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new epoch token. Must be captured before the asynchronous
    /// operation starts.
    pub fn begin_request(&self) -> RequestEpoch {
        RequestEpoch(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True iff `epoch` is still the most recently issued token.
    pub fn is_current(&self, epoch: RequestEpoch) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch.0
    }

    /// Settle a request: returns the outcome iff the epoch is still
    /// current, otherwise swallows it (success and failure alike).
    pub fn finish<T>(&self, epoch: RequestEpoch, outcome: T) -> Option<T> {
        if self.is_current(epoch) {
            Some(outcome)
        } else {
            tracing::trace!(epoch = epoch.0, "dropping superseded request outcome");
            None
        }
    }

    /// Invalidate all outstanding tokens without beginning a request.
    /// Used on teardown so nothing in flight can land afterwards.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}
