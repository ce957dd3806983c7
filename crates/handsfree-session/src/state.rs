//! Hands-free session states and the transitions between them.
//!
//! - Idle -> Starting (start requested)
//! - Starting -> Listening (engine confirmed start)
//! - Listening -> Stopping (stop requested)
//! - Stopping -> Idle (engine ended, or stop watchdog fired)
//! - Listening -> Paused -> Starting (pause / resume)
//! - any -> Idle (fatal error, engine end, forced disable)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the hands-free session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No capture in progress. Ready to start.
    #[default]
    Idle,
    /// Engine asked to start; waiting for its start event.
    Starting,
    /// Engine is capturing and reporting results.
    Listening,
    /// Engine asked to stop; waiting for its end event or the watchdog.
    Stopping,
    /// Microphone released for playback; the session is kept.
    Paused,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Stopping => write!(f, "Stopping"),
            SessionState::Paused => write!(f, "Paused"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, Starting)
                | (Starting, Listening)
                | (Listening, Stopping)
                | (Stopping, Idle)
                | (Listening, Paused)
                | (Paused, Starting)
                // Stop requested before the engine confirmed, or while paused
                | (Starting, Stopping)
                | (Paused, Stopping)
                // Forced back to idle
                | (Starting, Idle)
                | (Listening, Idle)
                | (Paused, Idle)
        )
    }

    /// Whether the engine may currently hold the microphone.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Listening)
    }
}
