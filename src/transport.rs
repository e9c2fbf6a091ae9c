//! Transport seams the engine is built against.
//!
//! The engine consumes two external collaborators: a resumable push channel
//! yielding serialized event frames, and a request/response fetch for the
//! resource snapshot and its historical log. Both are traits so the session
//! state machine can be driven by scripted fakes in tests, without a real
//! socket.

use crate::error::Result;
use crate::types::{OperationRecord, ResourceId, ResourceRecord, Sequence, SequencedEvent};
use crossbeam_channel::Receiver;

/// Result of fetching the watched resource.
#[derive(Clone, Debug)]
pub struct FetchResponse {
    /// The resource itself.
    pub resource: ResourceRecord,

    /// Dependent sub-resources (background operations).
    pub operations: Vec<OperationRecord>,
}

/// One open push connection.
///
/// Frames are raw serialized [`SequencedEvent`] payloads. The sender side
/// disconnecting models the channel closing without warning; dropping the
/// receiver closes the connection client-side.
pub struct PushConnection {
    pub frames: Receiver<Vec<u8>>,
}

/// Opens resumable push channels.
pub trait PushTransport: Send + Sync {
    /// Open a channel that replays all events with sequence strictly
    /// greater than `resume_after`, then streams live. May block, may fail,
    /// and the returned connection may close at any time.
    fn open(&self, id: &ResourceId, resume_after: Sequence) -> Result<PushConnection>;
}

/// Request/response fetch for resource state.
pub trait FetchTransport: Send + Sync {
    /// Current snapshot of the resource and its dependent sub-resources.
    fn fetch_resource(&self, id: &ResourceId) -> Result<FetchResponse>;

    /// Historical event log for the resource.
    fn fetch_history(&self, id: &ResourceId) -> Result<Vec<SequencedEvent>>;
}
