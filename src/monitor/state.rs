//! Monitor connection state.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Connection state of a balance monitor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Subscribed = 2,
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Subscribed,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Subscribed => "subscribed",
        })
    }
}

/// Lock-free cell holding a [`ConnectionState`].
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from(self.0.load(Ordering::Acquire))
    }

    /// Store `state`, returning the previous one.
    pub fn swap(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from(self.0.swap(state as u8, Ordering::AcqRel))
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}
