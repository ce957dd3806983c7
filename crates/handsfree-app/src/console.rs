//! Terminal stand-ins for the recognition engine and the session owner.
//!
//! The console engine behaves like a continuous recognizer: each line the
//! user types is appended to the current run's result list, and the whole
//! list is reported, so earlier segments reappear in later results.

use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

use handsfree_core::config::EngineConfig;
use handsfree_session::{
    EngineError, EngineEventSink, EngineFactory, RecognitionEngine, ResultSegment,
    SessionCallbacks, SessionControl,
};

#[derive(Debug, Default)]
struct Shared {
    sink: Option<EngineEventSink>,
    running: bool,
    segments: Vec<ResultSegment>,
}

/// Factory and remote control for the console engine.
#[derive(Debug, Clone, Default)]
pub struct ConsoleEngine {
    shared: Arc<Mutex<Shared>>,
}

impl ConsoleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak a line. A trailing `...` marks it as provisional. Returns `false`
    /// when the engine is not running and the line was dropped.
    pub fn hear(&self, line: &str) -> bool {
        let mut shared = self.shared.lock().expect("console engine mutex poisoned");
        if !shared.running {
            tracing::debug!("Not listening; line ignored");
            return false;
        }
        // Replace a trailing interim segment, as real engines do.
        if shared.segments.last().is_some_and(|s| !s.is_final) {
            shared.segments.pop();
        }
        let segment = match line.strip_suffix("...") {
            Some(partial) => ResultSegment::interim(partial),
            None => ResultSegment::final_text(line),
        };
        shared.segments.push(segment);
        let segments = shared.segments.clone();
        if let Some(sink) = shared.sink.as_ref() {
            sink.result(segments);
        }
        true
    }

    /// Report an engine error code, e.g. `not-allowed` or `network`.
    pub fn fail(&self, code: &str) {
        let shared = self.shared.lock().expect("console engine mutex poisoned");
        if let Some(sink) = shared.sink.as_ref() {
            sink.error(code);
        }
    }

    /// End the current run as if the engine timed out on its own.
    pub fn end(&self) {
        let mut shared = self.shared.lock().expect("console engine mutex poisoned");
        finish(&mut shared);
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.shared
            .lock()
            .expect("console engine mutex poisoned")
            .running
    }
}

fn finish(shared: &mut Shared) {
    if !shared.running {
        return;
    }
    shared.running = false;
    shared.segments.clear();
    if let Some(sink) = shared.sink.as_ref() {
        sink.ended();
    }
}

impl EngineFactory for ConsoleEngine {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, config: &EngineConfig) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        tracing::info!(
            locale = %config.locale,
            continuous = config.continuous,
            interim_results = config.interim_results,
            "Console recognition engine created"
        );
        Ok(Box::new(ConsoleRun {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ConsoleRun {
    shared: Arc<Mutex<Shared>>,
}

impl RecognitionEngine for ConsoleRun {
    fn bind(&mut self, sink: EngineEventSink) {
        self.shared.lock().expect("console engine mutex poisoned").sink = Some(sink);
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let mut shared = self.shared.lock().expect("console engine mutex poisoned");
        if shared.running {
            return Err(EngineError::AlreadyStarted);
        }
        shared.running = true;
        shared.segments.clear();
        if let Some(sink) = shared.sink.as_ref() {
            sink.started();
        }
        Ok(())
    }

    fn stop(&mut self) {
        let mut shared = self.shared.lock().expect("console engine mutex poisoned");
        finish(&mut shared);
    }
}

/// Prints session notifications to stdout and switches the session off when
/// it asks to be disabled.
#[derive(Debug, Default)]
pub struct ConsoleCallbacks {
    control: OnceLock<SessionControl>,
}

impl ConsoleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to the session these callbacks serve. Only the first call counts.
    pub fn attach(&self, control: SessionControl) {
        if self.control.set(control).is_err() {
            tracing::debug!("Console callbacks already attached");
        }
    }

    fn print(line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout only loses the echo.
        let _ = writeln!(out, "{line}");
    }
}

impl SessionCallbacks for ConsoleCallbacks {
    fn on_text_update(&self, text: &str) {
        if text.is_empty() {
            Self::print("  (cleared)");
        } else {
            Self::print(&format!("  > {text}"));
        }
    }

    fn on_auto_send(&self, text: &str) {
        Self::print(&format!("SENT: {text}"));
    }

    fn on_disable(&self) {
        match self.control.get() {
            Some(control) => {
                if let Err(e) = control.set_enabled(false) {
                    tracing::warn!(error = %e, "Failed to switch hands-free mode off");
                    return;
                }
                Self::print("Hands-free mode switched off. Use :enable to turn it back on.");
            }
            None => tracing::warn!("Disable requested before the session was attached"),
        }
    }

    fn on_stop(&self) {
        Self::print("Stopped listening.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handsfree_session::{HandsFreeSession, SessionState};
    use std::time::Duration;

    fn spawn(engine: &ConsoleEngine) -> HandsFreeSession {
        let callbacks = Arc::new(ConsoleCallbacks::new());
        let session = HandsFreeSession::builder(Arc::new(engine.clone()), callbacks.clone()).spawn();
        callbacks.attach(session.control());
        session
    }

    /// The engine answers from inside the session task, so its reply lands
    /// behind the first flush.
    async fn settle(session: &HandsFreeSession) {
        session.flush().await.unwrap();
        session.flush().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_engine_round_trip() {
        let engine = ConsoleEngine::new();
        let session = spawn(&engine);

        session.start().unwrap();
        settle(&session).await;
        assert!(engine.is_running());
        assert_eq!(session.state(), SessionState::Listening);

        assert!(engine.hear("hello"));
        session.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2600)).await;
        session.flush().await.unwrap();

        session.stop().unwrap();
        settle(&session).await;
        assert!(!engine.is_running());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_second_start_is_refused_while_running() {
        let engine = ConsoleEngine::new();
        let mut run = engine.create(&EngineConfig::default()).unwrap();
        assert!(run.start().is_ok());
        assert!(matches!(run.start(), Err(EngineError::AlreadyStarted)));
        run.stop();
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lines_ignored_when_not_running() {
        let engine = ConsoleEngine::new();
        let session = spawn(&engine);
        assert!(!engine.hear("nobody is listening"));
        session.flush().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);

        // Started then stopped: still dropped.
        session.start().unwrap();
        settle(&session).await;
        session.stop().unwrap();
        settle(&session).await;
        assert!(!engine.hear("too late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_failure_returns_to_idle() {
        let engine = ConsoleEngine::new();
        let session = spawn(&engine);
        session.start().unwrap();
        settle(&session).await;

        engine.fail("not-allowed");
        session.flush().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.error().as_deref(), Some("Microphone blocked"));

        settle(&session).await;
        assert!(!session.status().enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spoken_disable_switches_session_off() {
        let engine = ConsoleEngine::new();
        let session = spawn(&engine);
        session.start().unwrap();
        settle(&session).await;

        assert!(engine.hear("stop hands free"));
        session.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2600)).await;
        settle(&session).await;

        let status = session.status();
        assert!(!status.enabled);
        assert_eq!(status.state, SessionState::Idle);
        assert!(!engine.is_running());

        // Back on, a new cycle can start.
        session.set_enabled(true).unwrap();
        session.start().unwrap();
        settle(&session).await;
        assert!(session.status().enabled);
        assert_eq!(session.state(), SessionState::Listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spontaneous_end() {
        let engine = ConsoleEngine::new();
        let session = spawn(&engine);
        session.start().unwrap();
        settle(&session).await;

        engine.end();
        session.flush().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }
}
