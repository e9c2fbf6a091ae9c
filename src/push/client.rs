//! Resumable push-channel client.
//!
//! Maintains a best-effort, order-preserving stream of sequenced events for
//! one resource across drops and reconnects. The socket-callback style of
//! the surrounding transports is reframed as explicit state-machine
//! transitions (`handle_opened`, `handle_frame`, `handle_closed`,
//! `fire_reconnect`), driven by the session dispatcher. That keeps the
//! invariants (no reconnect after teardown, resume from the high-water
//! mark, attempt counting) testable with a scripted transport.

use crate::buffer::{Offer, SequencedEventBuffer};
use crate::error::Result;
use crate::push::backoff::Backoff;
use crate::transport::{PushConnection, PushTransport};
use crate::types::{ConnectionState, ResourceId, RetryState, Sequence, SequencedEvent};
use crossbeam_channel::{after, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Completion of one connect attempt, posted back to the session loop.
pub struct ConnectOutcome {
    /// Which attempt this belongs to; stale generations are discarded.
    pub generation: u64,
    pub result: Result<PushConnection>,
}

/// State machine for one resumable push connection.
pub struct PushChannelClient {
    transport: Arc<dyn PushTransport>,
    resource: ResourceId,
    backoff: Backoff,

    state: ConnectionState,
    retry: RetryState,

    /// Bumped on every connect and on disconnect; orphans stale attempts
    /// and pending timers.
    generation: u64,

    /// The live connection, if any.
    conn: Option<PushConnection>,

    /// Pending reconnect timer, if any.
    reconnect_timer: Option<Receiver<Instant>>,

    /// Ordered dedup buffer; also the source of the resume cursor.
    buffer: SequencedEventBuffer,

    /// Where connect attempts post their outcome.
    opened_tx: Sender<ConnectOutcome>,
}

impl PushChannelClient {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        resource: ResourceId,
        backoff: Backoff,
        opened_tx: Sender<ConnectOutcome>,
    ) -> Self {
        Self {
            transport,
            resource,
            backoff,
            state: ConnectionState::Disconnected,
            retry: RetryState::default(),
            generation: 0,
            conn: None,
            reconnect_timer: None,
            buffer: SequencedEventBuffer::new(),
            opened_tx,
        }
    }

    /// Begin a connect attempt resuming after the buffer's high-water mark.
    ///
    /// The open happens on a helper thread; the outcome arrives through the
    /// `ConnectOutcome` channel tagged with the attempt generation.
    pub fn connect(&mut self) {
        self.generation += 1;
        self.reconnect_timer = None;
        self.conn = None;
        self.state = ConnectionState::Connecting;

        let generation = self.generation;
        let transport = Arc::clone(&self.transport);
        let resource = self.resource.clone();
        let resume_after = self.buffer.high_water_mark();
        let opened_tx = self.opened_tx.clone();

        tracing::debug!(%resource, resume_after = resume_after.0, "opening push channel");

        thread::spawn(move || {
            let result = transport.open(&resource, resume_after);
            // Session may already be gone; nothing to do then.
            let _ = opened_tx.send(ConnectOutcome { generation, result });
        });
    }

    /// A connect attempt finished.
    pub fn handle_opened(&mut self, outcome: ConnectOutcome) {
        if outcome.generation != self.generation || self.state == ConnectionState::Disconnected {
            // Superseded attempt; dropping the connection closes it.
            tracing::trace!(generation = outcome.generation, "discarding stale connect outcome");
            return;
        }

        match outcome.result {
            Ok(conn) => {
                self.conn = Some(conn);
                self.retry.reset();
                self.state = ConnectionState::Live;
                tracing::debug!(resource = %self.resource, "push channel live");
            }
            Err(error) => {
                tracing::warn!(resource = %self.resource, %error, "push channel open failed");
                self.state = ConnectionState::Error;
                self.schedule_reconnect();
            }
        }
    }

    /// An inbound frame arrived. Returns the event iff it was parsed and
    /// appended; malformed or duplicate frames are dropped without closing
    /// the connection.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<SequencedEvent> {
        let event: SequencedEvent = match serde_json::from_slice(frame) {
            Ok(event) => event,
            Err(error) => {
                tracing::debug!(resource = %self.resource, %error, "dropping malformed push frame");
                return None;
            }
        };

        match self.buffer.offer(event.clone()) {
            Offer::Appended => Some(event),
            Offer::Dropped => None,
        }
    }

    /// The channel closed without teardown being requested.
    pub fn handle_closed(&mut self) {
        self.conn = None;
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Reconnecting;
        self.schedule_reconnect();
    }

    /// The pending backoff timer fired.
    pub fn fire_reconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.reconnect_timer = None;
        self.connect();
    }

    /// Operator-triggered reconnect: bypasses any pending backoff timer and
    /// starts over with a fresh attempt count.
    pub fn reconnect_now(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.retry.reset();
        self.connect();
    }

    /// Tear down. Idempotent; the only path that stops automatic
    /// reconnects. Cancels any pending timer and closes the live channel.
    pub fn disconnect(&mut self) {
        self.generation += 1;
        self.conn = None;
        self.reconnect_timer = None;
        self.state = ConnectionState::Disconnected;
    }

    fn schedule_reconnect(&mut self) {
        let attempt = self.retry.record_attempt();
        let delay = self.backoff.delay(attempt);
        tracing::debug!(
            resource = %self.resource,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "scheduling push reconnect"
        );
        self.reconnect_timer = Some(after(delay));
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.retry.attempts
    }

    /// Frame stream of the live connection, if any.
    pub fn frames(&self) -> Option<&Receiver<Vec<u8>>> {
        self.conn.as_ref().map(|c| &c.frames)
    }

    /// Pending reconnect timer, if any.
    pub fn reconnect_timer(&self) -> Option<&Receiver<Instant>> {
        self.reconnect_timer.as_ref()
    }

    /// The sequence a reconnect would resume from.
    pub fn resume_cursor(&self) -> Sequence {
        self.buffer.high_water_mark()
    }

    pub fn buffer(&self) -> &SequencedEventBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut SequencedEventBuffer {
        &mut self.buffer
    }
}
