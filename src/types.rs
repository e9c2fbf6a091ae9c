//! Core types for the sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque identifier for the logical resource a session tracks (e.g. a run id).
///
/// Exactly one session may be active per orchestrator; switching ids discards
/// the previous session entirely, including its sequence state.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        ResourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        ResourceId(s.to_string())
    }
}

/// Server-assigned position of an event in a resource's log.
///
/// The client never invents or reorders sequence numbers, it only filters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Severity of a log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl Default for EventLevel {
    fn default() -> Self {
        EventLevel::Info
    }
}

/// One entry in a resource's server-side event log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Server-assigned, per-resource monotonically increasing position.
    pub sequence: Sequence,

    /// When the server recorded the event.
    pub timestamp: Timestamp,

    /// Severity.
    #[serde(default)]
    pub level: EventLevel,

    /// Application-defined event kind (e.g. "progress", "warning").
    pub kind: String,

    /// Human-readable message.
    pub message: String,

    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

/// Status of the push channel for the active session.
///
/// Transitions are driven only by the push client; callers read it but never
/// set it. `Disconnected` is reached only via explicit teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Live,
    Reconnecting,
    Error,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

/// Lifecycle status of the watched resource.
///
/// This is the only business-adjacent value the engine interprets, and only
/// to decide terminality (whether polling may stop).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

impl ResourceStatus {
    /// True if no further server-side progress is expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResourceStatus::Success | ResourceStatus::Failed | ResourceStatus::Canceled
        )
    }
}

/// The watched resource as returned by a fetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Lifecycle status.
    pub status: ResourceStatus,

    /// Application-defined summary (opaque to the engine).
    pub summary: serde_json::Value,
}

/// A dependent sub-resource (e.g. a background operation tied to the run).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub kind: String,
    pub status: ResourceStatus,

    /// Application-defined detail (opaque to the engine).
    pub detail: serde_json::Value,
}

/// Last known value of the watched resource and its dependent sub-resources.
///
/// Created empty on session attach, replaced wholesale by each accepted
/// fetch, discarded on teardown.
#[derive(Clone, Debug, Default)]
pub struct ResourceSnapshot {
    pub resource: Option<ResourceRecord>,
    pub operations: Vec<OperationRecord>,

    /// When the accepted fetch completed (None until the first one lands).
    pub fetched_at: Option<Timestamp>,
}

impl ResourceSnapshot {
    /// True if the snapshot holds a resource in a terminal status.
    /// An empty snapshot is non-terminal.
    pub fn is_terminal(&self) -> bool {
        self.resource
            .as_ref()
            .map(|r| r.status.is_terminal())
            .unwrap_or(false)
    }
}

/// Reconnect attempt tracking for the push channel.
///
/// Reset on a successful open, incremented per scheduled reconnect, feeds
/// the backoff delay. Lives only for the duration of one session.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetryState {
    pub attempts: u32,
}

impl RetryState {
    /// Record a scheduled reconnect, returning the attempt count used for
    /// the delay computation (the count before the increment).
    pub fn record_attempt(&mut self) -> u32 {
        let used = self.attempts;
        self.attempts += 1;
        used
    }

    /// A connection opened successfully.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
