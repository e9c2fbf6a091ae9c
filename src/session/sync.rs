//! Session orchestrator: the only surface the presentation layer talks to.

use crate::error::{Result, SyncError};
use crate::polling::PollingFallback;
use crate::push::{Backoff, PushChannelClient};
use crate::session::updates::{update_stream, UpdateHandle};
use crate::session::worker::{Command, SessionShared, SessionWorker};
use crate::transport::{FetchTransport, PushTransport};
use crate::types::{ConnectionState, ResourceId, ResourceSnapshot, SequencedEvent};
use crossbeam_channel::{unbounded, Sender};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Sync engine configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Cadence of the polling fallback for non-terminal resources.
    pub poll_interval: Duration,

    /// Max buffered notifications per update stream before dropping.
    pub update_buffer_size: usize,

    /// Reconnect backoff schedule.
    pub backoff: Backoff,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            update_buffer_size: 1024,
            backoff: Backoff::default(),
        }
    }
}

/// One attached session.
struct ActiveSession {
    resource: ResourceId,
    shared: Arc<SessionShared>,
    commands: Sender<Command>,
}

/// Binds one logical resource id to exactly one push client, polling
/// fallback and request guard, and owns their full lifecycle.
///
/// All per-session state (event buffer, retry state, epoch counter,
/// snapshot) is constructed fresh on [`attach`](Self::attach) and discarded
/// on [`detach`](Self::detach); nothing is ambient or process-wide. The
/// presentation layer only ever receives read-only clones.
pub struct LiveResourceSync {
    push_transport: Arc<dyn PushTransport>,
    fetch_transport: Arc<dyn FetchTransport>,
    config: SyncConfig,
    session: Option<ActiveSession>,
}

impl LiveResourceSync {
    pub fn new(
        push_transport: Arc<dyn PushTransport>,
        fetch_transport: Arc<dyn FetchTransport>,
        config: SyncConfig,
    ) -> Self {
        Self {
            push_transport,
            fetch_transport,
            config,
            session: None,
        }
    }

    /// Attach to a resource, tearing down any existing session first (even
    /// when re-attaching to the same id; sessions never carry over).
    ///
    /// The session performs a guarded initial fetch of the resource, its
    /// dependent operations and its historical event log, seeds the event
    /// buffer, connects the push channel resuming from the highest sequence
    /// seen, and starts the polling fallback if the resource is not yet
    /// terminal. Returns the session's update stream.
    pub fn attach(&mut self, resource: ResourceId) -> UpdateHandle {
        self.detach();

        let shared = Arc::new(SessionShared::new());
        let (command_tx, command_rx) = unbounded();
        let (fetch_tx, fetch_rx) = unbounded();
        let (opened_tx, opened_rx) = unbounded();
        let (update_tx, update_handle) = update_stream(self.config.update_buffer_size);

        let push = PushChannelClient::new(
            Arc::clone(&self.push_transport),
            resource.clone(),
            self.config.backoff,
            opened_tx,
        );
        let poll = PollingFallback::new(self.config.poll_interval);

        let worker = SessionWorker::new(
            resource.clone(),
            Arc::clone(&self.fetch_transport),
            Arc::clone(&shared),
            update_tx,
            command_rx,
            fetch_tx,
            fetch_rx,
            opened_rx,
            push,
            poll,
        );

        tracing::debug!(%resource, "attaching session");
        thread::spawn(move || worker.run());

        self.session = Some(ActiveSession {
            resource,
            shared,
            commands: command_tx,
        });

        update_handle
    }

    /// Tear down the active session. Safe to call repeatedly and with no
    /// session active.
    ///
    /// Effective synchronously: the epoch bump guarantees any in-flight
    /// fetch completing afterwards is discarded, and the shutdown flag
    /// guarantees no pending reconnect timer or buffered frame is
    /// dispatched after this returns.
    pub fn detach(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(resource = %session.resource, "detaching session");
            session.shared.shutdown.store(true, Ordering::SeqCst);
            session.shared.guard.invalidate();
            *session.shared.connection.write() = ConnectionState::Disconnected;
            // Wake the worker if it is blocked; it may already be gone.
            let _ = session.commands.send(Command::Detach);
        }
    }

    /// Re-fetch the resource snapshot and its dependent operations with
    /// latest-wins semantics. The event buffer and push channel are
    /// untouched.
    pub fn manual_refresh(&self) -> Result<()> {
        self.send(Command::Refresh)
    }

    /// Operator-triggered reconnect: resets the backoff schedule and
    /// reconnects immediately, resuming from the current high-water mark.
    pub fn reconnect_now(&self) -> Result<()> {
        self.send(Command::ReconnectNow)
    }

    /// Id of the attached resource, if any.
    pub fn resource(&self) -> Option<&ResourceId> {
        self.session.as_ref().map(|s| &s.resource)
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// Current push-channel status. `Disconnected` when no session is
    /// active.
    pub fn connection_state(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map(|s| *s.shared.connection.read())
            .unwrap_or_default()
    }

    /// The last accepted resource snapshot. Empty when no session is
    /// active.
    pub fn snapshot(&self) -> ResourceSnapshot {
        self.session
            .as_ref()
            .map(|s| s.shared.snapshot.read().clone())
            .unwrap_or_default()
    }

    /// The session's visible event log: strictly increasing by sequence,
    /// append-only, duplicate-free.
    pub fn events(&self) -> Vec<SequencedEvent> {
        self.session
            .as_ref()
            .map(|s| s.shared.events.read().clone())
            .unwrap_or_default()
    }

    fn send(&self, command: Command) -> Result<()> {
        let session = self.session.as_ref().ok_or(SyncError::NoSession)?;
        session
            .commands
            .send(command)
            .map_err(|_| SyncError::WorkerGone)
    }
}

impl Drop for LiveResourceSync {
    fn drop(&mut self) {
        self.detach();
    }
}
