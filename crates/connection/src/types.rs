//! Public types for the TV connection manager.

use std::time::Duration;

use tvlink_protocol::constants::{SSAP_PORT, SSAP_TLS_PORT};
use tvlink_protocol::envelope::Message;

/// One managed TV, identified by address and security mode.
///
/// Immutable for the lifetime of a [`crate::ConnectionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub secure: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Canonical connection URL. Scheme and port follow the secure flag.
    pub fn url(&self) -> String {
        if self.secure {
            format!("wss://{}:{}", self.host, SSAP_TLS_PORT)
        } else {
            format!("ws://{}:{}", self.host, SSAP_PORT)
        }
    }
}

/// Connection state for a TV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// WebSocket handshake in progress.
    Connecting,
    /// Socket open, registration sent.
    Connected,
    /// Socket lost, retry loop running.
    Reconnecting,
    /// Socket lost.
    Disconnected,
}

/// Events emitted by the connection manager.
///
/// Delivered at most once to whoever holds the receiver; there is no
/// buffering beyond the channel and no replay.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Registration accepted; requests can be sent.
    Paired,
    /// Registration rejected or revoked.
    Unpaired,
    /// Socket lifecycle transition.
    StateChanged(ConnectionState),
    /// Inbound message not consumed by the dispatch logic.
    Inbound(Message),
}

/// Configuration for the fixed-interval reconnect loop.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between reconnection attempts. No backoff, no giving up.
    pub interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}
