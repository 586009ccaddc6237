use serde::{Deserialize, Serialize};

/// Plain WebSocket port (`ws://`).
pub const SSAP_PORT: u16 = 3000;

/// TLS WebSocket port (`wss://`). Newer firmware only answers here.
pub const SSAP_TLS_PORT: u16 = 3001;

/// Reserved message id for alert-hack traffic.
///
/// The monotonic request counter starts at 0 and only increases, so a
/// fixed negative id can never collide with it. Responses carrying this
/// id identify alerts created by [`crate::alert::alert_payload`] and are
/// auto-dismissed by the connection layer.
pub const ALERT_HACK_ID: i64 = -999;

/// Maximum inbound message size in bytes (1 MB).
///
/// SSAP payloads are small JSON objects; anything larger is dropped
/// before parsing.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// SSAP message type identifier.
///
/// Closed set decoded once at the boundary; the TV's loosely-typed
/// `type` strings never leak past deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Pairing handshake request (Hub -> TV).
    #[serde(rename = "register")]
    Register,
    /// Pairing handshake success (TV -> Hub), carries the client key.
    #[serde(rename = "registered")]
    Registered,
    /// Command request (Hub -> TV).
    #[serde(rename = "request")]
    Request,
    /// Command response (TV -> Hub).
    #[serde(rename = "response")]
    Response,
    #[serde(rename = "error")]
    Error,

    /// Forward compatibility: unknown message types deserialize here.
    #[serde(other)]
    Unknown,
}
