//! Resumable push channel: connection state machine and backoff schedule.

mod backoff;
mod client;

pub use backoff::Backoff;
pub use client::{ConnectOutcome, PushChannelClient};
