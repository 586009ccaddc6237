//! Connection layer for webOS TVs.
//!
//! One [`ConnectionManager`] per TV: owns the WebSocket, performs the
//! pairing handshake on every open, persists the client key, dispatches
//! inbound messages, and reconnects forever at a fixed interval when the
//! socket drops.

pub mod keystore;
pub mod manager;
pub mod pairing;
pub(crate) mod pumps;
pub(crate) mod reconnection;
pub mod types;
pub mod ws_client;

pub use keystore::KeyStore;
pub use manager::ConnectionManager;
pub use pairing::{PairingEvent, PairingState};
pub use types::{ConnectionEvent, ConnectionState, Endpoint, ReconnectConfig};
pub use ws_client::{ConnectionError, WsClient};
