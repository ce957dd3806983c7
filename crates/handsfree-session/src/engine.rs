//! Seams to the collaborators the session drives but does not implement:
//! the recognition engine, the caller's notification callbacks, and an
//! optional media player that is paused while the microphone is live.

use handsfree_core::config::EngineConfig;

use crate::adapter::EngineEventSink;
use crate::error::EngineError;

/// An asynchronous speech-recognition engine.
///
/// `start`/`stop`/`abort` are fire-and-forget requests; their effects are
/// reported later through the bound [`EngineEventSink`]. An engine may
/// deliver its end event late, early, or not at all.
pub trait RecognitionEngine: Send {
    /// Wire the engine's callbacks. Called once per engine instance.
    fn bind(&mut self, sink: EngineEventSink);

    /// Request recognition to begin. Fails synchronously if the engine is
    /// already running.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Request recognition to end after processing captured audio.
    fn stop(&mut self);

    /// Request recognition to end immediately. Engines without a faster
    /// path fall back to `stop`.
    fn abort(&mut self) {
        self.stop();
    }
}

/// Creates engines and reports whether the environment can host one.
pub trait EngineFactory: Send + Sync {
    fn is_supported(&self) -> bool;

    fn create(&self, config: &EngineConfig) -> Result<Box<dyn RecognitionEngine>, EngineError>;
}

/// Notifications delivered to the owner of the session.
///
/// Invoked from the session task; implementations should return quickly.
pub trait SessionCallbacks: Send + Sync {
    /// The transcript changed. An empty string means it was cleared.
    fn on_text_update(&self, text: &str);

    /// Text to submit after the silence deadline.
    fn on_auto_send(&self, text: &str);

    /// Hands-free mode should be switched off (spoken command or blocked
    /// microphone).
    fn on_disable(&self);

    /// A stop cycle finished. Fires at most once per cycle.
    fn on_stop(&self) {}
}

/// External media playback, paused while the session listens.
pub trait MediaController: Send + Sync {
    fn is_video_playing(&self) -> bool;
    fn pause_video(&self);
    fn resume_video(&self);
}
