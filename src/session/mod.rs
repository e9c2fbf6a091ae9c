//! Session lifecycle: orchestrator, per-session worker and update stream.

mod sync;
mod updates;
pub(crate) mod worker;

pub use sync::{LiveResourceSync, SyncConfig};
pub use updates::{SyncUpdate, UpdateHandle};
