//! SSAP wire protocol types for webOS TV communication.
//!
//! Pure data crate: message envelope, registration payload, command
//! target table, and the alert payload used to reach Luna endpoints.
//! No I/O here.

pub mod alert;
pub mod constants;
pub mod envelope;
pub mod registration;
pub mod uris;

// Re-export primary types for convenience.
pub use constants::MessageType;
pub use envelope::Message;
pub use uris::{Scheme, Target};
