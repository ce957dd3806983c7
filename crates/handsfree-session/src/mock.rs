//! Scriptable recognition engine for tests and demos.
//!
//! The mock never emits events on its own. Callers script the engine's side
//! of the conversation (`emit_started`, `emit_result`, `emit_ended`, ...) and
//! inspect the requests the session made through [`MockEngineFactory::calls`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use handsfree_core::config::EngineConfig;

use crate::adapter::{EngineEvent, EngineEventSink, ResultSegment};
use crate::engine::{EngineFactory, RecognitionEngine};
use crate::error::EngineError;

/// A request the session made to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create(EngineConfig),
    Bind,
    Start,
    Stop,
    Abort,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Mutex<Vec<EngineCall>>,
    sink: Mutex<Option<EngineEventSink>>,
    running: AtomicBool,
    refuse_next_start: AtomicBool,
    creates: AtomicUsize,
}

impl Shared {
    fn record(&self, call: EngineCall) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

/// Factory handing out mock engines that share one script/recording.
#[derive(Debug, Clone)]
pub struct MockEngineFactory {
    supported: bool,
    with_abort: bool,
    shared: Arc<Shared>,
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngineFactory {
    /// A supported environment whose engine implements `abort`.
    pub fn new() -> Self {
        Self {
            supported: true,
            with_abort: true,
            shared: Arc::new(Shared::default()),
        }
    }

    /// An environment without speech recognition.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// An engine that only knows `stop`.
    pub fn without_abort() -> Self {
        Self {
            with_abort: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn creates(&self) -> usize {
        self.shared.creates.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Make the next `start()` fail as if the engine were already running.
    pub fn refuse_next_start(&self) {
        self.shared.refuse_next_start.store(true, Ordering::SeqCst);
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(sink) = self.shared.sink.lock().expect("sink mutex poisoned").as_ref() {
            sink.emit(event);
        }
    }

    pub fn emit_started(&self) {
        self.emit(EngineEvent::Started);
    }

    pub fn emit_error(&self, code: &str) {
        self.emit(EngineEvent::Error(code.to_string()));
    }

    /// Emit a result list given as `(text, is_final)` pairs.
    pub fn emit_result(&self, segments: &[(&str, bool)]) {
        self.emit(EngineEvent::Result(
            segments
                .iter()
                .map(|(text, is_final)| ResultSegment {
                    text: (*text).to_string(),
                    is_final: *is_final,
                })
                .collect(),
        ));
    }

    pub fn emit_ended(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.emit(EngineEvent::Ended);
    }
}

impl EngineFactory for MockEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, config: &EngineConfig) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        if !self.supported {
            return Err(EngineError::Unsupported);
        }
        self.shared.creates.fetch_add(1, Ordering::SeqCst);
        self.shared.record(EngineCall::Create(config.clone()));
        Ok(Box::new(MockEngine {
            with_abort: self.with_abort,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockEngine {
    with_abort: bool,
    shared: Arc<Shared>,
}

impl RecognitionEngine for MockEngine {
    fn bind(&mut self, sink: EngineEventSink) {
        self.shared.record(EngineCall::Bind);
        *self.shared.sink.lock().expect("sink mutex poisoned") = Some(sink);
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.shared.record(EngineCall::Start);
        if self.shared.refuse_next_start.swap(false, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }
        self.shared.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.record(EngineCall::Stop);
    }

    fn abort(&mut self) {
        if self.with_abort {
            self.shared.record(EngineCall::Abort);
        } else {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_records_create() {
        let factory = MockEngineFactory::new();
        let _engine = factory.create(&EngineConfig::default()).unwrap();
        assert_eq!(factory.creates(), 1);
        assert_eq!(factory.calls(), vec![EngineCall::Create(EngineConfig::default())]);
    }

    #[test]
    fn test_unsupported_factory_refuses_create() {
        let factory = MockEngineFactory::unsupported();
        assert!(!factory.is_supported());
        assert!(matches!(
            factory.create(&EngineConfig::default()),
            Err(EngineError::Unsupported)
        ));
    }

    #[test]
    fn test_refuse_next_start_applies_once() {
        let factory = MockEngineFactory::new();
        let mut engine = factory.create(&EngineConfig::default()).unwrap();
        factory.refuse_next_start();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyStarted)));
        assert!(engine.start().is_ok());
        assert!(factory.is_running());
    }

    #[test]
    fn test_abort_falls_back_to_stop() {
        let factory = MockEngineFactory::without_abort();
        let mut engine = factory.create(&EngineConfig::default()).unwrap();
        engine.abort();
        assert_eq!(factory.count(&EngineCall::Stop), 1);
        assert_eq!(factory.count(&EngineCall::Abort), 0);
    }

    #[test]
    fn test_emit_without_bound_sink_is_noop() {
        let factory = MockEngineFactory::new();
        factory.emit_started();
        factory.emit_result(&[("hello", true)]);
        assert!(factory.calls().is_empty());
    }
}
