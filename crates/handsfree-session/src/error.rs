//! Errors reported by recognition engines.

use handsfree_core::error::HandsFreeError;

/// Synchronous failures from an engine's `create()` or `start()`.
///
/// These never reach callers of the session; the controller absorbs them
/// and surfaces a human-readable `error` string instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("speech recognition is not supported in this environment")]
    Unsupported,
    #[error("recognition has already started")]
    AlreadyStarted,
    #[error("engine failure: {0}")]
    Failed(String),
}

impl From<EngineError> for HandsFreeError {
    fn from(err: EngineError) -> Self {
        HandsFreeError::Engine(err.to_string())
    }
}
