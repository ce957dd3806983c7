//! Translation of the engine's four callbacks into session inputs.
//!
//! Engines hold an [`EngineEventSink`] and report through it; the sink
//! queues the event for the session task. Error codes are classified here
//! and result lists are flattened into transcript text.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::controller::SessionInput;

pub const MSG_UNSUPPORTED: &str = "Speech recognition is not supported on this platform";
pub const MSG_PERMISSION_DENIED: &str = "Microphone blocked";
pub const MSG_START_FAILED: &str = "Failed to start speech recognition";

/// One recognized segment as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSegment {
    pub text: String,
    pub is_final: bool,
}

impl ResultSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Callbacks an engine emits, in the order it emits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Started,
    Error(String),
    /// The engine's full result list for the current run.
    Result(Vec<ResultSegment>),
    Ended,
}

/// How an engine error code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Benign noise; resolution, if any, comes with the end event.
    Ignored,
    /// Microphone access refused. Forces idle and disables hands-free mode.
    PermissionDenied,
    /// Any other failure. Forces idle.
    Fatal,
}

impl ErrorClass {
    pub fn classify(code: &str) -> Self {
        match code {
            "aborted" | "no-speech" => ErrorClass::Ignored,
            "not-allowed" | "permission-denied" | "service-not-allowed" => {
                ErrorClass::PermissionDenied
            }
            _ => ErrorClass::Fatal,
        }
    }

    /// Human-readable error for fatal classes.
    pub fn message(&self, code: &str) -> Option<String> {
        match self {
            ErrorClass::Ignored => None,
            ErrorClass::PermissionDenied => Some(MSG_PERMISSION_DENIED.to_string()),
            ErrorClass::Fatal => Some(format!("Speech recognition error: {code}")),
        }
    }
}

/// Transcript text rebuilt from one result event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    /// Concatenation of segment texts from the consumption offset onward.
    pub text: String,
    /// Whether any of those segments is final.
    pub is_final: bool,
    /// Number of leading final segments in the whole list.
    pub stable: usize,
}

/// Flatten `segments[from..]` in index order.
///
/// A list shorter than `from` means the engine started a new run, so the
/// whole list is used.
pub fn reconstruct(segments: &[ResultSegment], from: usize) -> Reconstruction {
    let from = if from > segments.len() { 0 } else { from };
    let fresh = &segments[from..];

    Reconstruction {
        text: fresh.iter().map(|s| s.text.as_str()).collect(),
        is_final: fresh.iter().any(|s| s.is_final),
        stable: segments.iter().take_while(|s| s.is_final).count(),
    }
}

/// Handle through which an engine reports its callbacks to the session.
///
/// Bound exactly once per engine instance. Reporting after the session has
/// shut down is a silent no-op.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    tx: UnboundedSender<SessionInput>,
}

impl EngineEventSink {
    pub(crate) fn new(tx: UnboundedSender<SessionInput>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send(SessionInput::Engine(event)).is_err() {
            tracing::trace!("Engine event dropped: session closed");
        }
    }

    pub fn started(&self) {
        self.emit(EngineEvent::Started);
    }

    pub fn error(&self, code: impl Into<String>) {
        self.emit(EngineEvent::Error(code.into()));
    }

    pub fn result(&self, segments: Vec<ResultSegment>) {
        self.emit(EngineEvent::Result(segments));
    }

    pub fn ended(&self) {
        self.emit(EngineEvent::Ended);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ignored_codes() {
        assert_eq!(ErrorClass::classify("aborted"), ErrorClass::Ignored);
        assert_eq!(ErrorClass::classify("no-speech"), ErrorClass::Ignored);
    }

    #[test]
    fn test_classify_permission_codes() {
        for code in ["not-allowed", "permission-denied", "service-not-allowed"] {
            assert_eq!(ErrorClass::classify(code), ErrorClass::PermissionDenied);
        }
    }

    #[test]
    fn test_classify_everything_else_is_fatal() {
        for code in ["network", "audio-capture", "language-not-supported", ""] {
            assert_eq!(ErrorClass::classify(code), ErrorClass::Fatal);
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ErrorClass::Ignored.message("aborted"), None);
        assert_eq!(
            ErrorClass::PermissionDenied.message("not-allowed").as_deref(),
            Some("Microphone blocked")
        );
        assert_eq!(
            ErrorClass::Fatal.message("network").as_deref(),
            Some("Speech recognition error: network")
        );
    }

    #[test]
    fn test_reconstruct_concatenates_in_order() {
        let segments = vec![
            ResultSegment::final_text("turn the"),
            ResultSegment::interim(" lights on"),
        ];
        let r = reconstruct(&segments, 0);
        assert_eq!(r.text, "turn the lights on");
        assert!(r.is_final);
        assert_eq!(r.stable, 1);
    }

    #[test]
    fn test_reconstruct_interim_only() {
        let segments = vec![ResultSegment::interim("hel")];
        let r = reconstruct(&segments, 0);
        assert_eq!(r.text, "hel");
        assert!(!r.is_final);
        assert_eq!(r.stable, 0);
    }

    #[test]
    fn test_reconstruct_skips_consumed_segments() {
        let segments = vec![
            ResultSegment::final_text("already sent"),
            ResultSegment::interim(" next"),
        ];
        let r = reconstruct(&segments, 1);
        assert_eq!(r.text, " next");
        assert!(!r.is_final, "consumed final segments do not count");
        assert_eq!(r.stable, 1);
    }

    #[test]
    fn test_reconstruct_resets_offset_on_shorter_list() {
        let segments = vec![ResultSegment::final_text("fresh run")];
        let r = reconstruct(&segments, 3);
        assert_eq!(r.text, "fresh run");
        assert!(r.is_final);
    }

    #[test]
    fn test_reconstruct_empty() {
        let r = reconstruct(&[], 0);
        assert_eq!(r.text, "");
        assert!(!r.is_final);
        assert_eq!(r.stable, 0);
    }
}
