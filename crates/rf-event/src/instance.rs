//! Event instance identity and lifecycle

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique playing instance ID
pub type PlayingId = u64;

/// Global playing ID counter
static NEXT_PLAYING_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique playing ID. The caller picks the ID so queued
/// commands can refer to an instance before the sink has seen it.
pub fn generate_playing_id() -> PlayingId {
    NEXT_PLAYING_ID.fetch_add(1, Ordering::Relaxed)
}

/// Invalid playing ID (for error cases)
pub const INVALID_PLAYING_ID: PlayingId = 0;

/// State of an event instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventInstanceState {
    #[default]
    Playing = 0,
    Paused = 1,
    /// Stopped explicitly or by `stop_all`
    Stopped = 2,
}

impl EventInstanceState {
    /// Check if instance is active (playing or paused)
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, EventInstanceState::Playing | EventInstanceState::Paused)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        *self == EventInstanceState::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_ids_unique() {
        let a = generate_playing_id();
        let b = generate_playing_id();
        assert_ne!(a, b);
        assert_ne!(a, INVALID_PLAYING_ID);
    }

    #[test]
    fn test_state_flags() {
        assert!(EventInstanceState::Paused.is_active());
        assert!(!EventInstanceState::Stopped.is_active());
        assert!(EventInstanceState::Stopped.is_finished());
    }
}
