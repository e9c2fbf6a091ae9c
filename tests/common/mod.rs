//! Scripted fake transports for driving the engine without a real server.

use crossbeam_channel::{unbounded, Sender};
use livesync::{
    EventLevel, FetchResponse, FetchTransport, OperationRecord, PushConnection, PushTransport,
    ResourceId, ResourceRecord, ResourceStatus, Result, Sequence, SequencedEvent, SyncError,
    Timestamp,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub fn event(sequence: u64) -> SequencedEvent {
    SequencedEvent {
        sequence: Sequence(sequence),
        timestamp: Timestamp(0),
        level: EventLevel::Info,
        kind: "progress".to_string(),
        message: format!("event {}", sequence),
        fields: None,
    }
}

pub fn frame(sequence: u64) -> Vec<u8> {
    serde_json::to_vec(&event(sequence)).unwrap()
}

pub fn response(status: ResourceStatus) -> FetchResponse {
    FetchResponse {
        resource: ResourceRecord {
            status,
            summary: serde_json::json!({ "job": "nightly" }),
        },
        operations: vec![OperationRecord {
            id: "op-1".to_string(),
            kind: "upload".to_string(),
            status,
            detail: serde_json::Value::Null,
        }],
    }
}

/// One scripted reply for a resource fetch, consumed in call order.
pub enum FetchStep {
    Ok(ResourceStatus),
    /// Reply after a delay (simulates a slow request in flight).
    Slow(Duration, ResourceStatus),
    Fail(String),
    SlowFail(Duration, String),
}

/// Fetch transport replaying a script; repeats the last successful status
/// once the script is exhausted.
pub struct ScriptedFetch {
    steps: Mutex<VecDeque<FetchStep>>,
    last_status: Mutex<ResourceStatus>,
    history: Mutex<Vec<SequencedEvent>>,
    pub resource_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl ScriptedFetch {
    pub fn new(initial: ResourceStatus) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(initial),
            history: Mutex::new(Vec::new()),
            resource_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_history(self, history: Vec<SequencedEvent>) -> Self {
        *self.history.lock() = history;
        self
    }

    pub fn set_history(&self, history: Vec<SequencedEvent>) {
        *self.history.lock() = history;
    }

    pub fn push_step(&self, step: FetchStep) {
        self.steps.lock().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }
}

impl FetchTransport for ScriptedFetch {
    fn fetch_resource(&self, _id: &ResourceId) -> Result<FetchResponse> {
        // Claim the step and bump the counter atomically so a test that
        // waits on the call count knows which request holds which step.
        let step = {
            let mut steps = self.steps.lock();
            let step = steps.pop_front();
            self.resource_calls.fetch_add(1, Ordering::SeqCst);
            step
        };
        match step {
            Some(FetchStep::Ok(status)) => {
                *self.last_status.lock() = status;
                Ok(response(status))
            }
            Some(FetchStep::Slow(delay, status)) => {
                std::thread::sleep(delay);
                *self.last_status.lock() = status;
                Ok(response(status))
            }
            Some(FetchStep::Fail(message)) => Err(SyncError::transport(message)),
            Some(FetchStep::SlowFail(delay, message)) => {
                std::thread::sleep(delay);
                Err(SyncError::transport(message))
            }
            None => Ok(response(*self.last_status.lock())),
        }
    }

    fn fetch_history(&self, _id: &ResourceId) -> Result<Vec<SequencedEvent>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.history.lock().clone())
    }
}

/// Push transport handing out connections whose sender side the test
/// controls: frames are injected with [`send_frame`](Self::send_frame) and
/// the channel is dropped with [`close`](Self::close).
pub struct FakePush {
    opens: Mutex<Vec<Sequence>>,
    senders: Mutex<Vec<Sender<Vec<u8>>>>,
    fail_opens: Mutex<u32>,
}

impl FakePush {
    pub fn new() -> Self {
        Self {
            opens: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
            fail_opens: Mutex::new(0),
        }
    }

    pub fn fail_next_opens(&self, count: u32) {
        *self.fail_opens.lock() = count;
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    pub fn resume_cursors(&self) -> Vec<Sequence> {
        self.opens.lock().clone()
    }

    /// Inject a frame into the most recent connection.
    pub fn send_frame(&self, payload: Vec<u8>) {
        if let Some(sender) = self.senders.lock().last() {
            let _ = sender.send(payload);
        }
    }

    /// Drop the most recent connection's sender, closing the channel.
    pub fn close(&self) {
        self.senders.lock().pop();
    }
}

impl PushTransport for FakePush {
    fn open(&self, _id: &ResourceId, resume_after: Sequence) -> Result<PushConnection> {
        self.opens.lock().push(resume_after);
        let mut fail = self.fail_opens.lock();
        if *fail > 0 {
            *fail -= 1;
            return Err(SyncError::transport("connection refused"));
        }
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        Ok(PushConnection { frames: rx })
    }
}

/// Spin until `pred` holds or the timeout elapses; returns whether it held.
pub fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
