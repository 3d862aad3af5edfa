//! Outbound channel for position records.
//!
//! The channel handle is shared between the reporter's send path and the
//! reconnect path; every implementation guards it with a single lock held only
//! for the duration of one handle access.

pub mod memory;
pub mod udp;

use crate::prelude::LocalizerResult;
use serde::{Deserialize, Serialize};

pub use memory::MemoryChannel;
pub use udp::UdpChannel;

/// Result of a single send attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// The datagram was handed to the network with this many bytes.
    Sent(usize),
    /// No destination is connected; nothing was sent.
    Skipped,
}

/// Connectionless, best-effort datagram channel.
pub trait RecordChannel: Send + Sync {
    /// Opens the channel towards `host:port`, closing any previous connection first.
    /// An empty host leaves the channel disconnected.
    fn connect(&self, host: &str, port: u16) -> LocalizerResult<()>;
    fn disconnect(&self);
    fn is_connected(&self) -> bool;
    fn send(&self, payload: &[u8]) -> LocalizerResult<Delivery>;
}
