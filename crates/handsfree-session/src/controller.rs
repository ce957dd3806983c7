//! The session state machine.
//!
//! [`Controller`] is the only mutable storage of a hands-free session. It is
//! owned by one tokio task and fed one [`SessionInput`] at a time, so API
//! calls, engine callbacks and deadline firings never interleave. Every
//! transition is guarded by the current state rather than by assuming that
//! a request will be answered by its matching engine event.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, warn};

use handsfree_core::config::{EngineConfig, SessionConfig};
use handsfree_core::events::{SessionEvent, StopReason};
use handsfree_core::types::{SessionId, Timestamp};

use crate::adapter::{
    EngineEvent, EngineEventSink, ErrorClass, ResultSegment, MSG_START_FAILED, MSG_UNSUPPORTED,
};
use crate::commands::{interpret, SilenceOutcome, VoiceCommand};
use crate::engine::{EngineFactory, MediaController, RecognitionEngine, SessionCallbacks};
use crate::handle::SessionStatus;
use crate::state::SessionState;
use crate::timer::Deadline;
use crate::transcript::Transcript;

/// Upper bound on how long `Stopping` waits for the engine's end event.
pub(crate) const STOP_WATCHDOG: Duration = Duration::from_millis(200);

/// Upper bound on how long a resume waits for the pause's end event before
/// restarting the engine anyway.
pub(crate) const PAUSE_END_GRACE: Duration = Duration::from_millis(200);

/// Everything the session task reacts to.
#[derive(Debug)]
pub(crate) enum SessionInput {
    Start,
    Stop,
    Pause,
    Resume,
    SetEnabled(bool),
    Engine(EngineEvent),
    SilenceElapsed(u64),
    StopWatchdogElapsed(u64),
    PauseEndElapsed(u64),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Collaborators and channels handed to the controller at spawn time.
pub(crate) struct Wiring {
    pub(crate) factory: Arc<dyn EngineFactory>,
    pub(crate) callbacks: Arc<dyn SessionCallbacks>,
    pub(crate) media: Option<Arc<dyn MediaController>>,
    pub(crate) inbox: UnboundedSender<SessionInput>,
    pub(crate) status: watch::Sender<SessionStatus>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
}

pub(crate) struct Controller {
    settings: SessionConfig,
    engine_config: EngineConfig,
    supported: bool,
    enabled: bool,

    state: SessionState,
    paused: bool,
    /// Set by `resume()` until the engine confirms the restart.
    resuming: bool,
    /// The engine's end event for a pause has not arrived yet.
    pause_end_outstanding: bool,
    /// `resume()` is waiting for the pause's end before starting the engine.
    start_deferred: bool,
    was_media_playing: bool,
    /// A stop notification is owed for the current cycle.
    stop_owed: bool,

    engine: Option<Box<dyn RecognitionEngine>>,
    handlers_bound: bool,

    transcript: Transcript,
    silence: Deadline,
    watchdog: Deadline,
    pause_end: Deadline,
    error: Option<String>,
    session_id: SessionId,

    wiring: Wiring,
}

impl Controller {
    pub(crate) fn new(settings: SessionConfig, engine_config: EngineConfig, wiring: Wiring) -> Self {
        let supported = wiring.factory.is_supported();
        let enabled = settings.enabled;
        Self {
            settings,
            engine_config,
            supported,
            enabled,
            state: SessionState::Idle,
            paused: false,
            resuming: false,
            pause_end_outstanding: false,
            start_deferred: false,
            was_media_playing: false,
            stop_owed: false,
            engine: None,
            handlers_bound: false,
            transcript: Transcript::new(),
            silence: Deadline::new("silence"),
            watchdog: Deadline::new("stop-watchdog"),
            pause_end: Deadline::new("pause-end"),
            error: None,
            session_id: SessionId::nil(),
            wiring,
        }
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            supported: self.supported,
            enabled: self.enabled,
            state: self.state,
            listening: self.state == SessionState::Listening,
            paused: self.paused,
            error: self.error.clone(),
        }
    }

    pub(crate) async fn run(mut self, mut inbox: UnboundedReceiver<SessionInput>) {
        while let Some(input) = inbox.recv().await {
            let keep_running = self.handle(input);
            self.publish_status();
            if !keep_running {
                break;
            }
        }
        debug!("Hands-free session task exited");
    }

    /// Process one input. Returns `false` once the session has shut down.
    pub(crate) fn handle(&mut self, input: SessionInput) -> bool {
        match input {
            SessionInput::Start => self.start(),
            SessionInput::Stop => self.stop(),
            SessionInput::Pause => self.pause(),
            SessionInput::Resume => self.resume(),
            SessionInput::SetEnabled(enabled) => self.set_enabled(enabled),
            SessionInput::Engine(event) => self.on_engine_event(event),
            SessionInput::SilenceElapsed(generation) => self.on_silence_elapsed(generation),
            SessionInput::StopWatchdogElapsed(generation) => self.on_watchdog_elapsed(generation),
            SessionInput::PauseEndElapsed(generation) => self.on_pause_end_elapsed(generation),
            SessionInput::Flush(reply) => {
                let _ = reply.send(());
            }
            SessionInput::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    // =========================================================================
    // Caller operations
    // =========================================================================

    fn start(&mut self) {
        if self.state != SessionState::Idle {
            debug!(state = %self.state, "start ignored: session not idle");
            return;
        }
        if !self.supported {
            self.error = Some(MSG_UNSUPPORTED.to_string());
            return;
        }
        if !self.ensure_engine() {
            self.error = Some(MSG_START_FAILED.to_string());
            return;
        }

        self.session_id = SessionId::new();
        self.paused = false;
        self.resuming = false;
        self.pause_end_outstanding = false;
        self.start_deferred = false;
        self.stop_owed = true;
        self.transcript.restart();
        self.transition(SessionState::Starting);
        info!(session_id = %self.session_id, locale = %self.engine_config.locale, "Hands-free session starting");
        self.emit(SessionEvent::SessionStarted {
            session_id: self.session_id,
            locale: self.engine_config.locale.clone(),
            timestamp: Timestamp::now(),
        });
        self.request_engine_start();
    }

    fn stop(&mut self) {
        if matches!(self.state, SessionState::Idle | SessionState::Stopping) {
            debug!(state = %self.state, "stop ignored");
            return;
        }
        self.silence.cancel();
        self.clear_pause_end();
        self.paused = false;
        self.resuming = false;
        if let Some(engine) = self.engine.as_mut() {
            engine.abort();
        }
        self.transition(SessionState::Stopping);
        self.watchdog.arm(
            STOP_WATCHDOG,
            &self.wiring.inbox,
            SessionInput::StopWatchdogElapsed,
        );
    }

    fn pause(&mut self) {
        if !self.enabled || self.state != SessionState::Listening {
            debug!(state = %self.state, enabled = self.enabled, "pause ignored");
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
        self.silence.cancel();
        self.paused = true;
        self.pause_end_outstanding = true;
        self.pause_end.arm(
            PAUSE_END_GRACE,
            &self.wiring.inbox,
            SessionInput::PauseEndElapsed,
        );
        self.transition(SessionState::Paused);
        self.emit(SessionEvent::SessionPaused {
            session_id: self.session_id,
            timestamp: Timestamp::now(),
        });
    }

    fn resume(&mut self) {
        if !self.enabled || !self.paused {
            debug!(paused = self.paused, enabled = self.enabled, "resume ignored");
            return;
        }
        if matches!(self.state, SessionState::Listening | SessionState::Starting) {
            debug!(state = %self.state, "resume ignored: already running");
            return;
        }
        self.paused = false;
        self.resuming = true;
        self.transcript.carry_over();
        self.transition(SessionState::Starting);
        self.emit(SessionEvent::SessionResumed {
            session_id: self.session_id,
            timestamp: Timestamp::now(),
        });
        if self.pause_end_outstanding {
            // Any end event until then belongs to the paused run.
            debug!("engine start deferred until the pause ends");
            self.start_deferred = true;
        } else {
            self.request_engine_start();
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        info!(enabled, "Hands-free mode {}", if enabled { "enabled" } else { "disabled" });
        if enabled || (self.state == SessionState::Idle && !self.paused) {
            return;
        }

        // Hard reset: no stop notification for this cycle, now or later.
        if let Some(engine) = self.engine.as_mut() {
            engine.abort();
        }
        self.silence.cancel();
        self.watchdog.cancel();
        self.clear_pause_end();
        self.paused = false;
        self.resuming = false;
        self.stop_owed = false;
        self.clear_transcript();
        self.enter_idle();
        self.emit_stopped(StopReason::Disabled);
    }

    fn shutdown(&mut self) {
        let was_running = self.state != SessionState::Idle || self.paused;
        if was_running {
            if let Some(engine) = self.engine.as_mut() {
                engine.abort();
            }
        }
        self.silence.cancel();
        self.watchdog.cancel();
        self.clear_pause_end();
        self.paused = false;
        self.stop_owed = false;
        self.enter_idle();
        if was_running {
            self.emit_stopped(StopReason::Shutdown);
        }
        info!("Hands-free session shut down");
    }

    // =========================================================================
    // Engine events
    // =========================================================================

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Started => self.on_engine_started(),
            EngineEvent::Error(code) => self.on_engine_error(&code),
            EngineEvent::Result(segments) => self.on_engine_result(&segments),
            EngineEvent::Ended => self.on_engine_ended(),
        }
    }

    fn on_engine_started(&mut self) {
        // Ordered delivery: a pause's end can no longer follow this start.
        self.clear_pause_end();
        if self.state != SessionState::Starting {
            debug!(state = %self.state, "engine start discarded");
            return;
        }
        self.error = None;
        if !self.resuming {
            if let Some(media) = self.wiring.media.as_ref() {
                self.was_media_playing = media.is_video_playing();
                if self.was_media_playing {
                    media.pause_video();
                }
            }
        }
        self.resuming = false;
        self.transition(SessionState::Listening);
        self.emit(SessionEvent::ListeningStarted {
            session_id: self.session_id,
            timestamp: Timestamp::now(),
        });
    }

    fn on_engine_error(&mut self, code: &str) {
        let class = ErrorClass::classify(code);
        let Some(message) = class.message(code) else {
            debug!(code, state = %self.state, "engine error ignored");
            return;
        };
        if !self.state.is_active() {
            debug!(code, state = %self.state, "engine error dropped outside an active cycle");
            return;
        }

        warn!(session_id = %self.session_id, code, "Speech recognition failed");
        self.error = Some(message.clone());
        self.enter_idle();
        self.emit(SessionEvent::EngineFailed {
            session_id: self.session_id,
            code: code.to_string(),
            message,
            timestamp: Timestamp::now(),
        });
        if class == ErrorClass::PermissionDenied {
            self.wiring.callbacks.on_disable();
        }
    }

    fn on_engine_result(&mut self, segments: &[ResultSegment]) {
        if self.state != SessionState::Listening {
            debug!(state = %self.state, "engine result discarded");
            return;
        }
        let applied = self.transcript.apply(segments);
        self.wiring.callbacks.on_text_update(&applied.text);
        self.emit(SessionEvent::TranscriptUpdated {
            session_id: self.session_id,
            text_length: applied.text.len(),
            is_final: applied.is_final,
            timestamp: Timestamp::now(),
        });
        if applied.is_final {
            self.silence.arm(
                Duration::from_millis(self.settings.silence_ms),
                &self.wiring.inbox,
                SessionInput::SilenceElapsed,
            );
        }
    }

    fn on_engine_ended(&mut self) {
        self.watchdog.cancel();
        match self.state {
            SessionState::Paused => {
                self.pause_end.cancel();
                self.pause_end_outstanding = false;
                debug!("engine end confirms pause");
                return;
            }
            SessionState::Starting if self.start_deferred => {
                debug!("late engine end from pause absorbed");
                self.clear_pause_end();
                self.request_engine_start();
                return;
            }
            _ => {}
        }

        // No further events until restarted, whatever state we were in.
        self.paused = false;
        self.resuming = false;
        self.enter_idle();
        self.finish_cycle(StopReason::EngineEnded);
    }

    // =========================================================================
    // Deadlines
    // =========================================================================

    fn on_watchdog_elapsed(&mut self, generation: u64) {
        if !self.watchdog.fire(generation) || self.state != SessionState::Stopping {
            return;
        }
        warn!(session_id = %self.session_id, "Engine did not confirm stop; forcing idle");
        self.enter_idle();
        self.finish_cycle(StopReason::Watchdog);
    }

    fn on_pause_end_elapsed(&mut self, generation: u64) {
        if !self.pause_end.fire(generation) {
            return;
        }
        self.pause_end_outstanding = false;
        if std::mem::take(&mut self.start_deferred) && self.state == SessionState::Starting {
            warn!(session_id = %self.session_id, "Engine did not confirm pause; restarting anyway");
            self.request_engine_start();
        }
    }

    fn on_silence_elapsed(&mut self, generation: u64) {
        if !self.silence.fire(generation) || self.state != SessionState::Listening {
            return;
        }

        match interpret(self.transcript.text()) {
            SilenceOutcome::Command(VoiceCommand::Cancel) => {
                info!(session_id = %self.session_id, "Cancel command recognized");
                self.emit_command(VoiceCommand::Cancel);
                self.transcript.clear();
                self.wiring.callbacks.on_text_update("");
            }
            SilenceOutcome::Command(VoiceCommand::Disable) => {
                info!(session_id = %self.session_id, "Disable command recognized");
                self.emit_command(VoiceCommand::Disable);
                self.wiring.callbacks.on_disable();
                self.transcript.clear();
                self.wiring.callbacks.on_text_update("");
            }
            SilenceOutcome::Send(text) if self.settings.auto_send => {
                info!(session_id = %self.session_id, text_len = text.len(), "Auto-sending transcript");
                self.wiring.callbacks.on_auto_send(&text);
                self.emit(SessionEvent::AutoSent {
                    session_id: self.session_id,
                    text,
                    timestamp: Timestamp::now(),
                });
                self.clear_transcript();
            }
            SilenceOutcome::Send(_) => {
                debug!("auto-send disabled; transcript kept");
            }
            SilenceOutcome::Nothing => {}
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Create the engine on first use and bind its callbacks exactly once.
    fn ensure_engine(&mut self) -> bool {
        if self.engine.is_none() {
            match self.wiring.factory.create(&self.engine_config) {
                Ok(engine) => self.engine = Some(engine),
                Err(e) => {
                    warn!(error = %e, "Failed to create recognition engine");
                    return false;
                }
            }
        }
        if !self.handlers_bound {
            if let Some(engine) = self.engine.as_mut() {
                engine.bind(EngineEventSink::new(self.wiring.inbox.clone()));
                self.handlers_bound = true;
            }
        }
        true
    }

    fn request_engine_start(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let Err(e) = engine.start() {
            warn!(session_id = %self.session_id, error = %e, "Engine refused to start");
            engine.stop();
            self.error = Some(MSG_START_FAILED.to_string());
            self.resuming = false;
            self.stop_owed = false;
            self.enter_idle();
        }
    }

    fn transition(&mut self, target: SessionState) {
        debug_assert!(
            self.state.can_transition_to(&target),
            "invalid transition {} -> {}",
            self.state,
            target
        );
        debug!("Hands-free state: {} -> {}", self.state, target);
        self.state = target;
    }

    /// Forget the pause's pending end event and any start waiting on it.
    fn clear_pause_end(&mut self) {
        self.pause_end.cancel();
        self.pause_end_outstanding = false;
        self.start_deferred = false;
    }

    /// Every path into idle goes through here.
    fn enter_idle(&mut self) {
        self.silence.cancel();
        self.clear_pause_end();
        if self.was_media_playing {
            self.was_media_playing = false;
            if let Some(media) = self.wiring.media.as_ref() {
                media.resume_video();
            }
        }
        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
    }

    /// Deliver the stop notification if this cycle still owes one.
    fn finish_cycle(&mut self, reason: StopReason) {
        if !std::mem::take(&mut self.stop_owed) {
            debug!(?reason, "stop already reported for this cycle");
            return;
        }
        info!(session_id = %self.session_id, ?reason, "Hands-free session stopped");
        self.wiring.callbacks.on_stop();
        self.emit_stopped(reason);
    }

    fn clear_transcript(&mut self) {
        if self.transcript.clear() {
            self.wiring.callbacks.on_text_update("");
        }
    }

    fn emit_command(&self, command: VoiceCommand) {
        self.emit(SessionEvent::CommandRecognized {
            session_id: self.session_id,
            command: command.as_str().to_string(),
            timestamp: Timestamp::now(),
        });
    }

    fn emit_stopped(&self, reason: StopReason) {
        self.emit(SessionEvent::SessionStopped {
            session_id: self.session_id,
            reason,
            timestamp: Timestamp::now(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        tracing::trace!(event = event.event_name(), "Session event");
        // No subscribers is fine.
        let _ = self.wiring.events.send(event);
    }

    pub(crate) fn publish_status(&self) {
        let next = self.status();
        self.wiring.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
