//! Per-session event loop.
//!
//! One dispatcher thread per session, selecting over the command stream,
//! guarded-fetch completions, connect completions, live push frames, the
//! reconnect timer and the polling ticker. Helper threads only ever post a
//! completion message back here, so every state transition happens on this
//! thread and correctness rests on the epoch guard and the buffer's
//! monotonicity check, not on delivery order.

use crate::buffer::Offer;
use crate::guard::{RequestEpoch, RequestGuard};
use crate::polling::PollingFallback;
use crate::push::{ConnectOutcome, PushChannelClient};
use crate::session::updates::{SyncUpdate, UpdateSender};
use crate::transport::{FetchResponse, FetchTransport};
use crate::types::{
    ConnectionState, ResourceId, ResourceSnapshot, SequencedEvent, Timestamp,
};
use crossbeam_channel::{never, select, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Imperative calls forwarded from the orchestrator.
pub(crate) enum Command {
    Refresh,
    ReconnectNow,
    Detach,
}

/// What a guarded fetch was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FetchKind {
    Initial,
    Manual,
    Poll,
}

/// Payload of a successful guarded fetch.
pub(crate) struct FetchPayload {
    pub response: FetchResponse,
    /// Historical event log; only requested by the initial fetch.
    pub history: Option<Vec<SequencedEvent>>,
}

/// Completion of one guarded fetch, posted by its helper thread.
pub(crate) struct FetchCompletion {
    pub kind: FetchKind,
    pub epoch: RequestEpoch,
    pub result: crate::error::Result<FetchPayload>,
}

/// State shared between the orchestrator (caller thread) and the worker.
///
/// The caller only ever reads the observables; the shutdown flag and epoch
/// guard are what make `detach` synchronously effective.
pub(crate) struct SessionShared {
    pub guard: RequestGuard,
    pub shutdown: AtomicBool,
    pub connection: RwLock<ConnectionState>,
    pub snapshot: RwLock<ResourceSnapshot>,
    pub events: RwLock<Vec<SequencedEvent>>,
}

impl SessionShared {
    pub fn new() -> Self {
        Self {
            guard: RequestGuard::new(),
            shutdown: AtomicBool::new(false),
            // The session begins loading immediately.
            connection: RwLock::new(ConnectionState::Connecting),
            snapshot: RwLock::new(ResourceSnapshot::default()),
            events: RwLock::new(Vec::new()),
        }
    }
}

/// One dispatched step of the session loop.
enum Step {
    Command(Command),
    Fetch(FetchCompletion),
    Opened(ConnectOutcome),
    Frame(Vec<u8>),
    ChannelClosed,
    ReconnectTimer,
    PollTick,
    Shutdown,
}

pub(crate) struct SessionWorker {
    resource: ResourceId,
    fetch: Arc<dyn FetchTransport>,
    shared: Arc<SessionShared>,
    updates: UpdateSender,

    commands: Receiver<Command>,
    fetch_tx: Sender<FetchCompletion>,
    fetch_rx: Receiver<FetchCompletion>,
    opened_rx: Receiver<ConnectOutcome>,

    push: PushChannelClient,
    poll: PollingFallback,

    /// Last connection state published to the observables.
    published_connection: ConnectionState,

    /// Whether the push channel has been started. The first current fetch
    /// to settle starts it, normally the initial one; a manual refresh that
    /// supersedes the initial fetch inherits the job.
    push_started: bool,

    /// Whether polling has ever been started. Once stopped (terminal
    /// snapshot or a poll failure) it is never restarted within a session.
    poll_started: bool,
}

impl SessionWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resource: ResourceId,
        fetch: Arc<dyn FetchTransport>,
        shared: Arc<SessionShared>,
        updates: UpdateSender,
        commands: Receiver<Command>,
        fetch_tx: Sender<FetchCompletion>,
        fetch_rx: Receiver<FetchCompletion>,
        opened_rx: Receiver<ConnectOutcome>,
        push: PushChannelClient,
        poll: PollingFallback,
    ) -> Self {
        Self {
            resource,
            fetch,
            shared,
            updates,
            commands,
            fetch_tx,
            fetch_rx,
            opened_rx,
            push,
            poll,
            published_connection: ConnectionState::Connecting,
            push_started: false,
            poll_started: false,
        }
    }

    /// Run the session to completion.
    pub fn run(mut self) {
        self.begin_fetch(FetchKind::Initial);

        let commands = self.commands.clone();
        let fetch_rx = self.fetch_rx.clone();
        let opened_rx = self.opened_rx.clone();

        loop {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let frames = self.push.frames().cloned().unwrap_or_else(never);
            let reconnect = self.push.reconnect_timer().cloned().unwrap_or_else(never);
            let ticker = self.poll.ticker().cloned().unwrap_or_else(never);

            let step = select! {
                recv(commands) -> msg => match msg {
                    Ok(command) => Step::Command(command),
                    // Orchestrator dropped without an explicit detach.
                    Err(_) => Step::Shutdown,
                },
                recv(fetch_rx) -> msg => msg.map(Step::Fetch).unwrap_or(Step::Shutdown),
                recv(opened_rx) -> msg => msg.map(Step::Opened).unwrap_or(Step::Shutdown),
                recv(frames) -> msg => msg.map(Step::Frame).unwrap_or(Step::ChannelClosed),
                recv(reconnect) -> _ => Step::ReconnectTimer,
                recv(ticker) -> _ => Step::PollTick,
            };

            // Teardown requested while we were blocked: nothing selected
            // after this point may have observable effect.
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match step {
                Step::Command(Command::Refresh) => self.begin_fetch(FetchKind::Manual),
                Step::Command(Command::ReconnectNow) => {
                    self.push.reconnect_now();
                    self.publish_connection();
                }
                Step::Command(Command::Detach) | Step::Shutdown => break,
                Step::Fetch(completion) => self.handle_fetch(completion),
                Step::Opened(outcome) => {
                    self.push.handle_opened(outcome);
                    self.publish_connection();
                }
                Step::Frame(bytes) => self.handle_frame(&bytes),
                Step::ChannelClosed => {
                    self.push.handle_closed();
                    self.publish_connection();
                }
                Step::ReconnectTimer => {
                    self.push.fire_reconnect();
                    self.publish_connection();
                }
                Step::PollTick => self.handle_poll_tick(),
            }
        }

        self.teardown();
    }

    /// Issue a guarded fetch on a helper thread. The epoch is captured
    /// before the fetch starts; the completion carries it back.
    fn begin_fetch(&mut self, kind: FetchKind) {
        let epoch = self.shared.guard.begin_request();
        let fetch = Arc::clone(&self.fetch);
        let resource = self.resource.clone();
        let fetch_tx = self.fetch_tx.clone();
        let with_history = kind == FetchKind::Initial;

        thread::spawn(move || {
            let result = fetch.fetch_resource(&resource).and_then(|response| {
                let history = if with_history {
                    Some(fetch.fetch_history(&resource)?)
                } else {
                    None
                };
                Ok(FetchPayload { response, history })
            });
            // The session may be gone by the time we finish.
            let _ = fetch_tx.send(FetchCompletion {
                kind,
                epoch,
                result,
            });
        });
    }

    fn handle_fetch(&mut self, completion: FetchCompletion) {
        let FetchCompletion {
            kind,
            epoch,
            result,
        } = completion;

        // Superseded outcomes vanish, success and failure alike.
        let result = match self.shared.guard.finish(epoch, result) {
            Some(result) => result,
            None => return,
        };

        match result {
            Ok(payload) => self.apply_fetch(payload),
            Err(error) => self.handle_fetch_failure(kind, error),
        }
    }

    fn apply_fetch(&mut self, payload: FetchPayload) {
        let snapshot = ResourceSnapshot {
            resource: Some(payload.response.resource),
            operations: payload.response.operations,
            fetched_at: Some(Timestamp::now()),
        };
        let terminal = snapshot.is_terminal();

        *self.shared.snapshot.write() = snapshot;
        self.updates.emit(SyncUpdate::SnapshotUpdated);

        if let Some(mut history) = payload.history {
            // The buffer enforces monotonic dedup; sort so a well-formed
            // history lands in full.
            history.sort_by_key(|e| e.sequence);
            for event in history {
                if self.push.buffer_mut().offer(event.clone()) == Offer::Appended {
                    self.shared.events.write().push(event.clone());
                    self.updates.emit(SyncUpdate::Event(event));
                }
            }
        }

        if !self.push_started {
            // Resume after everything the historical log covered.
            self.push_started = true;
            self.push.connect();
            self.publish_connection();
        }

        if terminal {
            self.poll.stop();
        } else if !self.poll_started {
            self.poll_started = true;
            self.poll.start();
        }
    }

    fn handle_fetch_failure(&mut self, kind: FetchKind, error: crate::error::SyncError) {
        match kind {
            FetchKind::Initial => {
                tracing::warn!(resource = %self.resource, %error, "initial fetch failed");
                self.updates.emit(SyncUpdate::RefreshFailed {
                    message: error.to_string(),
                });
                // Live events still flow (connect below); polling stays off
                // because there is no snapshot to judge terminal.
            }
            FetchKind::Manual => {
                tracing::warn!(resource = %self.resource, %error, "manual refresh failed");
                self.updates.emit(SyncUpdate::RefreshFailed {
                    message: error.to_string(),
                });
            }
            FetchKind::Poll => {
                // Stop rather than retry forever and mask a dead session;
                // the user can always refresh manually.
                tracing::debug!(resource = %self.resource, %error, "poll fetch failed, stopping polling");
                self.poll.stop();
            }
        }

        if !self.push_started {
            self.push_started = true;
            self.push.connect();
            self.publish_connection();
        }
    }

    fn handle_frame(&mut self, bytes: &[u8]) {
        if let Some(event) = self.push.handle_frame(bytes) {
            self.shared.events.write().push(event.clone());
            self.updates.emit(SyncUpdate::Event(event));
        }
    }

    fn handle_poll_tick(&mut self) {
        if self.shared.snapshot.read().is_terminal() {
            self.poll.stop();
            return;
        }
        self.begin_fetch(FetchKind::Poll);
    }

    fn publish_connection(&mut self) {
        if !self.push_started {
            return;
        }
        let state = self.push.state();
        if state != self.published_connection {
            self.published_connection = state;
            *self.shared.connection.write() = state;
            self.updates.emit(SyncUpdate::Connection(state));
        }
    }

    fn teardown(mut self) {
        self.push.disconnect();
        self.poll.stop();
        *self.shared.connection.write() = ConnectionState::Disconnected;
        self.updates.emit(SyncUpdate::Detached);
        tracing::debug!(resource = %self.resource, "session torn down");
    }
}
