//! The session's transcript buffer.
//!
//! Invariant: [`Transcript::text`] is always the string last reported to the
//! caller through the text-update callback. The controller reports the result
//! of every [`Transcript::apply`], and reports a [`Transcript::clear`] only
//! when it changed the text.

use crate::adapter::{reconstruct, ResultSegment};

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    text: String,
    /// Text carried over from before a pause; prepended to the resumed run.
    prefix: String,
    /// Leading final segments of the current run already sent or discarded.
    consumed: usize,
    /// Leading final segments in the most recent result list.
    stable: usize,
}

/// Outcome of applying one result event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub text: String,
    pub is_final: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Rebuild the text from the engine's current result list.
    pub fn apply(&mut self, segments: &[ResultSegment]) -> Applied {
        if segments.len() < self.consumed {
            self.consumed = 0;
        }
        let rebuilt = reconstruct(segments, self.consumed);
        self.stable = rebuilt.stable;
        self.text = format!("{}{}", self.prefix, rebuilt.text);
        Applied {
            text: self.text.clone(),
            is_final: rebuilt.is_final,
        }
    }

    /// Empty the buffer. Segments seen so far in this run will not be
    /// reported again. Returns `true` if the text changed.
    pub fn clear(&mut self) -> bool {
        let changed = !self.text.is_empty();
        self.text.clear();
        self.prefix.clear();
        self.consumed = self.stable;
        changed
    }

    /// A new engine run is starting after a pause: keep the text as prefix.
    pub fn carry_over(&mut self) {
        self.prefix = self.text.clone();
        self.consumed = 0;
        self.stable = 0;
    }

    /// A new engine run is starting from idle: results replace the text.
    pub fn restart(&mut self) {
        self.prefix.clear();
        self.consumed = 0;
        self.stable = 0;
    }
}
