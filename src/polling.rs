//! Polling fallback for resource-level status changes.
//!
//! The push channel conveys event-log entries; it cannot be trusted to
//! convey resource-level status transitions, so a non-terminal resource is
//! re-fetched on a fixed cadence. The session loop owns the tick policy
//! (skip-and-stop on a terminal snapshot, stop on the first still-current
//! fetch failure); this type owns the timer lifecycle.

use crossbeam_channel::{tick, Receiver};
use std::time::{Duration, Instant};

/// Cancellable repeating timer driving snapshot re-fetches.
pub struct PollingFallback {
    interval: Duration,
    ticker: Option<Receiver<Instant>>,
}

impl PollingFallback {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticker: None,
        }
    }

    /// Begin ticking. Restarting an active poller resets its cadence.
    pub fn start(&mut self) {
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "polling started");
        self.ticker = Some(tick(self.interval));
    }

    /// Cancel the timer. Idempotent; always called on teardown.
    pub fn stop(&mut self) {
        if self.ticker.take().is_some() {
            tracing::debug!("polling stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.ticker.is_some()
    }

    /// The tick stream, if active.
    pub fn ticker(&self) -> Option<&Receiver<Instant>> {
        self.ticker.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_is_idempotent() {
        let mut poll = PollingFallback::new(Duration::from_millis(5));
        assert!(!poll.is_active());

        poll.start();
        assert!(poll.is_active());
        assert!(poll.ticker().is_some());

        poll.stop();
        poll.stop();
        assert!(!poll.is_active());
        assert!(poll.ticker().is_none());
    }

    #[test]
    fn test_ticker_fires_on_cadence() {
        let mut poll = PollingFallback::new(Duration::from_millis(5));
        poll.start();
        let ticker = poll.ticker().unwrap().clone();
        assert!(ticker.recv_timeout(Duration::from_millis(500)).is_ok());
        assert!(ticker.recv_timeout(Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn test_restart_replaces_ticker() {
        let mut poll = PollingFallback::new(Duration::from_millis(5));
        poll.start();
        poll.stop();
        poll.start();
        assert!(poll.is_active());
    }
}
