//! # Live Resource Sync Engine
//!
//! An in-memory coordination primitive that keeps a client's view of one
//! long-lived, server-driven resource correct: a resumable push channel
//! that survives drops without gaps or duplicates, latest-wins refresh
//! fetches that can complete out of order, and a polling fallback that
//! self-stops once the resource reaches a terminal state.
//!
//! ## Core Concepts
//!
//! - **Session**: one [`LiveResourceSync`] binds one resource id to exactly
//!   one push client, polling fallback and request guard; switching
//!   resources discards everything
//! - **Sequenced events**: server-assigned sequence numbers; the engine
//!   only filters, producing a strictly increasing, duplicate-free log
//! - **Request epochs**: each fetch captures a token; only the most
//!   recently issued fetch may write the snapshot
//! - **Connection state**: reconnects back off exponentially (1s doubling,
//!   30s ceiling) until teardown or a manual reconnect
//!
//! ## Example
//!
//! ```ignore
//! use livesync::{LiveResourceSync, ResourceId, SyncConfig, SyncUpdate};
//!
//! let mut sync = LiveResourceSync::new(push_transport, fetch_transport, SyncConfig::default());
//! let updates = sync.attach(ResourceId::from("run-42"));
//!
//! while let Ok(update) = updates.recv() {
//!     match update {
//!         SyncUpdate::Event(event) => println!("{}", event.message),
//!         SyncUpdate::SnapshotUpdated => render(sync.snapshot()),
//!         SyncUpdate::Connection(state) => show_status(state),
//!         SyncUpdate::RefreshFailed { message } => toast(message),
//!         SyncUpdate::Detached => break,
//!     }
//! }
//!
//! sync.detach();
//! ```

pub mod buffer;
pub mod error;
pub mod guard;
pub mod polling;
pub mod push;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports
pub use buffer::{Offer, SequencedEventBuffer};
pub use error::{Result, SyncError};
pub use guard::{RequestEpoch, RequestGuard};
pub use polling::PollingFallback;
pub use push::{Backoff, PushChannelClient};
pub use session::{LiveResourceSync, SyncConfig, SyncUpdate, UpdateHandle};
pub use transport::{FetchResponse, FetchTransport, PushConnection, PushTransport};
pub use types::*;
