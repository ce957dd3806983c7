use serde::{Deserialize, Serialize};

use crate::types::{SessionId, Timestamp};

/// Why a hands-free cycle returned to idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The engine reported its end event.
    EngineEnded,
    /// The engine never confirmed the stop; the fallback timer fired.
    Watchdog,
    /// Hands-free mode was switched off.
    Disabled,
    /// The session task was shut down.
    Shutdown,
}

/// Domain events emitted by a hands-free session.
///
/// Consumed by UI layers and logs; delivery is best-effort (a lagging or
/// absent subscriber never blocks the session).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// `start()` accepted; the engine has been asked to start.
    SessionStarted {
        session_id: SessionId,
        locale: String,
        timestamp: Timestamp,
    },

    /// The engine confirmed it is capturing audio.
    ListeningStarted {
        session_id: SessionId,
        timestamp: Timestamp,
    },

    /// The transcript changed and was reported to the caller.
    TranscriptUpdated {
        session_id: SessionId,
        text_length: usize,
        is_final: bool,
        timestamp: Timestamp,
    },

    /// A spoken command was recognized at the silence deadline.
    CommandRecognized {
        session_id: SessionId,
        command: String,
        timestamp: Timestamp,
    },

    /// Text was submitted after the silence deadline.
    AutoSent {
        session_id: SessionId,
        text: String,
        timestamp: Timestamp,
    },

    /// The microphone was released without ending the session.
    SessionPaused {
        session_id: SessionId,
        timestamp: Timestamp,
    },

    /// A paused session asked the engine to start again.
    SessionResumed {
        session_id: SessionId,
        timestamp: Timestamp,
    },

    /// The engine reported a fatal error.
    EngineFailed {
        session_id: SessionId,
        code: String,
        message: String,
        timestamp: Timestamp,
    },

    /// The cycle reached idle.
    SessionStopped {
        session_id: SessionId,
        reason: StopReason,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SessionEvent::SessionStarted { timestamp, .. }
            | SessionEvent::ListeningStarted { timestamp, .. }
            | SessionEvent::TranscriptUpdated { timestamp, .. }
            | SessionEvent::CommandRecognized { timestamp, .. }
            | SessionEvent::AutoSent { timestamp, .. }
            | SessionEvent::SessionPaused { timestamp, .. }
            | SessionEvent::SessionResumed { timestamp, .. }
            | SessionEvent::EngineFailed { timestamp, .. }
            | SessionEvent::SessionStopped { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the session the event belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::SessionStarted { session_id, .. }
            | SessionEvent::ListeningStarted { session_id, .. }
            | SessionEvent::TranscriptUpdated { session_id, .. }
            | SessionEvent::CommandRecognized { session_id, .. }
            | SessionEvent::AutoSent { session_id, .. }
            | SessionEvent::SessionPaused { session_id, .. }
            | SessionEvent::SessionResumed { session_id, .. }
            | SessionEvent::EngineFailed { session_id, .. }
            | SessionEvent::SessionStopped { session_id, .. } => *session_id,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "session_started",
            SessionEvent::ListeningStarted { .. } => "listening_started",
            SessionEvent::TranscriptUpdated { .. } => "transcript_updated",
            SessionEvent::CommandRecognized { .. } => "command_recognized",
            SessionEvent::AutoSent { .. } => "auto_sent",
            SessionEvent::SessionPaused { .. } => "session_paused",
            SessionEvent::SessionResumed { .. } => "session_resumed",
            SessionEvent::EngineFailed { .. } => "engine_failed",
            SessionEvent::SessionStopped { .. } => "session_stopped",
        }
    }
}
