//! Edge-triggered pairing state.

use std::sync::atomic::{AtomicBool, Ordering};

/// Notification produced when the pairing state flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingEvent {
    Paired,
    Unpaired,
}

/// Tracks whether requests can currently be sent to the TV.
///
/// The setter only reports a transition when the value actually
/// changes; repeated identical sets are no-ops.
#[derive(Debug, Default)]
pub struct PairingState {
    paired: AtomicBool,
}

impl PairingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paired(&self) -> bool {
        self.paired.load(Ordering::SeqCst)
    }

    /// Sets the state. Returns the event to emit iff the value changed.
    pub fn set(&self, value: bool) -> Option<PairingEvent> {
        let previous = self.paired.swap(value, Ordering::SeqCst);
        if previous == value {
            return None;
        }
        Some(if value {
            PairingEvent::Paired
        } else {
            PairingEvent::Unpaired
        })
    }
}
