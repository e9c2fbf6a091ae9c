//! Ordered, deduplicated event log for one logical resource.
//!
//! All inbound events pass through the buffer regardless of origin
//! (historical fetch, live push frame, replay after a reconnect). The
//! high-water mark makes the visible log strictly increasing by sequence
//! with no duplicates, no matter how many times the same event arrives.

use crate::types::{Sequence, SequencedEvent};

/// Outcome of offering an event to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    /// Event was appended to the visible log.
    Appended,
    /// Event was a duplicate or stale (sequence at or below the mark).
    Dropped,
}

/// Deduplicates and orders an incoming stream of sequence-numbered events.
///
/// Events are never evicted within a session; the buffer is bounded by
/// session lifetime, not by policy.
#[derive(Debug, Default)]
pub struct SequencedEventBuffer {
    /// Largest sequence accepted so far.
    high_water: Sequence,
    /// The visible log, strictly increasing by sequence.
    events: Vec<SequencedEvent>,
}

impl SequencedEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the high-water mark to `last_known` without replaying events.
    ///
    /// Called when a session starts from an initial fetch whose historical
    /// log is handled elsewhere. Never lowers the mark.
    pub fn seed(&mut self, last_known: Sequence) {
        if last_known > self.high_water {
            self.high_water = last_known;
        }
    }

    /// Offer an event. Appends iff its sequence is strictly greater than
    /// the high-water mark.
    pub fn offer(&mut self, event: SequencedEvent) -> Offer {
        if event.sequence <= self.high_water {
            return Offer::Dropped;
        }
        self.high_water = event.sequence;
        self.events.push(event);
        Offer::Appended
    }

    /// The largest sequence accepted so far. Reconnects resume from here.
    pub fn high_water_mark(&self) -> Sequence {
        self.high_water
    }

    /// The visible log, in acceptance (= sequence) order.
    pub fn events(&self) -> &[SequencedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
