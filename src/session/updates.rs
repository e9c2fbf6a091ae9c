//! Change notifications for one session.
//!
//! The presentation layer reads merged state through the orchestrator's
//! accessors; the update stream only tells it *that* something changed (and
//! carries the one-shot failure notification for explicit user actions).
//! Bounded buffer with drop-on-full: a slow consumer loses notifications,
//! never session state.

use crate::types::{ConnectionState, SequencedEvent};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Duration;

/// Notifications emitted by an active session.
#[derive(Clone, Debug)]
pub enum SyncUpdate {
    /// Push-channel status changed.
    Connection(ConnectionState),

    /// The resource snapshot was replaced by an accepted fetch.
    SnapshotUpdated,

    /// An event was appended to the visible log.
    Event(SequencedEvent),

    /// The current outcome of an explicit user action (initial load or
    /// manual refresh) was a failure. Emitted at most once per action;
    /// stale and background failures are never surfaced this way.
    RefreshFailed { message: String },

    /// The session was torn down.
    Detached,
}

/// Receiving side of a session's update stream.
pub struct UpdateHandle {
    receiver: Receiver<SyncUpdate>,
}

impl UpdateHandle {
    /// Receive the next update (blocking).
    pub fn recv(&self) -> Result<SyncUpdate, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an update (non-blocking).
    pub fn try_recv(&self) -> Result<SyncUpdate, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<SyncUpdate, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Sending side, held by the session worker.
#[derive(Clone)]
pub(crate) struct UpdateSender {
    sender: Sender<SyncUpdate>,
}

impl UpdateSender {
    /// Best-effort emit. Updates are dropped if the buffer is full or the
    /// handle is gone; the session itself is unaffected.
    pub fn emit(&self, update: SyncUpdate) {
        if self.sender.try_send(update).is_err() {
            tracing::trace!("update stream full or closed, notification dropped");
        }
    }
}

/// Create a connected update stream with the given buffer size.
pub(crate) fn update_stream(buffer_size: usize) -> (UpdateSender, UpdateHandle) {
    let (sender, receiver) = bounded(buffer_size);
    (UpdateSender { sender }, UpdateHandle { receiver })
}
