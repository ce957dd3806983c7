//! Public handle to a running hands-free session.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

use handsfree_core::config::{EngineConfig, HandsFreeConfig, SessionConfig};
use handsfree_core::error::{HandsFreeError, Result};
use handsfree_core::events::SessionEvent;

use crate::controller::{Controller, SessionInput, Wiring};
use crate::engine::{EngineFactory, MediaController, SessionCallbacks};
use crate::state::SessionState;

const EVENT_CAPACITY: usize = 64;

/// Snapshot of the session as seen by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Whether the environment can host a recognition engine. Fixed at spawn.
    pub supported: bool,
    pub enabled: bool,
    pub state: SessionState,
    /// `true` only while the engine is confirmed to be capturing.
    pub listening: bool,
    pub paused: bool,
    /// Last human-readable failure, cleared when the engine next starts.
    pub error: Option<String>,
}

/// Configures and spawns a [`HandsFreeSession`].
pub struct SessionBuilder {
    factory: Arc<dyn EngineFactory>,
    callbacks: Arc<dyn SessionCallbacks>,
    media: Option<Arc<dyn MediaController>>,
    session: SessionConfig,
    engine: EngineConfig,
}

impl SessionBuilder {
    pub fn new(factory: Arc<dyn EngineFactory>, callbacks: Arc<dyn SessionCallbacks>) -> Self {
        Self {
            factory,
            callbacks,
            media: None,
            session: SessionConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Take the `[session]` and `[engine]` sections of a loaded config.
    pub fn config(mut self, config: &HandsFreeConfig) -> Self {
        self.session = config.session.clone();
        self.engine = config.engine.clone();
        self
    }

    pub fn session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn media(mut self, media: Arc<dyn MediaController>) -> Self {
        self.media = Some(media);
        self
    }

    /// Spawn the session task on the current tokio runtime.
    pub fn spawn(self) -> HandsFreeSession {
        let (inbox, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (status_tx, status) = watch::channel(SessionStatus::default());

        let wiring = Wiring {
            factory: self.factory,
            callbacks: self.callbacks,
            media: self.media,
            inbox: inbox.clone(),
            status: status_tx,
            events: events.clone(),
        };
        let controller = Controller::new(self.session, self.engine, wiring);
        controller.publish_status();

        tracing::debug!(supported = status.borrow().supported, "Hands-free session spawned");
        let task = tokio::spawn(controller.run(rx));

        HandsFreeSession {
            control: SessionControl { inbox },
            status,
            events,
            task,
        }
    }
}

/// Cloneable sender for the control operations of a session.
///
/// Lets collaborators such as [`SessionCallbacks`] implementations act on the
/// session that calls them. Requests are queued behind the input being
/// handled, never run re-entrantly.
#[derive(Debug, Clone)]
pub struct SessionControl {
    inbox: UnboundedSender<SessionInput>,
}

impl SessionControl {
    pub fn start(&self) -> Result<()> {
        self.send(SessionInput::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(SessionInput::Stop)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(SessionInput::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(SessionInput::Resume)
    }

    /// Switching off while a cycle is running forces it back to idle.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.send(SessionInput::SetEnabled(enabled))
    }

    fn send(&self, input: SessionInput) -> Result<()> {
        self.inbox
            .send(input)
            .map_err(|_| HandsFreeError::ShuttingDown)
    }
}

/// Handle to a hands-free session task.
///
/// Control operations return immediately; their effects become visible
/// through [`status`](Self::status), the callbacks, and the event stream once
/// the engine answers. They only fail when the session has shut down.
pub struct HandsFreeSession {
    control: SessionControl,
    status: watch::Receiver<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl HandsFreeSession {
    pub fn builder(
        factory: Arc<dyn EngineFactory>,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> SessionBuilder {
        SessionBuilder::new(factory, callbacks)
    }

    pub fn start(&self) -> Result<()> {
        self.control.start()
    }

    pub fn stop(&self) -> Result<()> {
        self.control.stop()
    }

    pub fn pause(&self) -> Result<()> {
        self.control.pause()
    }

    pub fn resume(&self) -> Result<()> {
        self.control.resume()
    }

    /// Switching off while a cycle is running forces it back to idle.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.control.set_enabled(enabled)
    }

    /// A cloneable sender for the control operations.
    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn is_supported(&self) -> bool {
        self.status.borrow().supported
    }

    pub fn is_listening(&self) -> bool {
        self.status.borrow().listening
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn error(&self) -> Option<String> {
        self.status.borrow().error.clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Resolves once every input queued before this call has been handled.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.control.send(SessionInput::Flush(tx))?;
        rx.await.map_err(|_| HandsFreeError::ShuttingDown)
    }

    /// Abort the engine, cancel deadlines and end the session task.
    pub async fn shutdown(self) -> Result<()> {
        // Already gone is fine: the task is awaited below either way.
        let _ = self.control.inbox.send(SessionInput::Shutdown);
        self.task
            .await
            .map_err(|e| HandsFreeError::Session(format!("session task failed: {e}")))
    }
}
