//! Hands-free voice session: drives an asynchronous speech-recognition engine
//! through start/stop/pause cycles, accumulates recognized text, interprets a
//! small set of spoken commands, and auto-submits text after silence.
//!
//! One tokio task owns the session. API calls, engine callbacks and deadline
//! firings are all messages on a single queue, so every input runs to
//! completion before the next is looked at:
//! Idle -> Starting -> Listening -> Stopping -> Idle, with Paused as an
//! overlay that frees the microphone without ending the session.

pub mod adapter;
pub mod commands;
mod controller;
pub mod engine;
pub mod error;
pub mod handle;
pub mod mock;
pub mod state;
mod timer;
pub mod transcript;

pub use adapter::{EngineEvent, EngineEventSink, ErrorClass, ResultSegment};
pub use commands::{SilenceOutcome, VoiceCommand};
pub use engine::{EngineFactory, MediaController, RecognitionEngine, SessionCallbacks};
pub use error::EngineError;
pub use handle::{HandsFreeSession, SessionBuilder, SessionControl, SessionStatus};
pub use mock::{EngineCall, MockEngineFactory};
pub use state::SessionState;
