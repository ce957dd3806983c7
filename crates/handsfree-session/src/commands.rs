//! Spoken command interpretation at the silence deadline.

/// Phrases that switch hands-free mode off.
pub const DISABLE_PHRASES: [&str; 4] = [
    "stop hands free",
    "stop hands-free",
    "turn off hands free",
    "turn off hands-free",
];

/// Phrase that discards the current transcript.
pub const CANCEL_PHRASE: &str = "cancel";

/// A recognized voice command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Discard the transcript without sending.
    Cancel,
    /// Turn hands-free mode off.
    Disable,
}

impl VoiceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceCommand::Cancel => "cancel",
            VoiceCommand::Disable => "disable",
        }
    }
}

/// What to do with the transcript once the silence deadline expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilenceOutcome {
    Command(VoiceCommand),
    /// Submit this text (trimmed, original case).
    Send(String),
    /// Nothing was said.
    Nothing,
}

/// Classify the transcript. Commands must match the whole utterance after
/// trimming and lowercasing; anything else non-empty is sent as spoken.
pub fn interpret(transcript: &str) -> SilenceOutcome {
    let trimmed = transcript.trim();
    let normalized = trimmed.to_lowercase();

    if normalized == CANCEL_PHRASE {
        SilenceOutcome::Command(VoiceCommand::Cancel)
    } else if DISABLE_PHRASES.contains(&normalized.as_str()) {
        SilenceOutcome::Command(VoiceCommand::Disable)
    } else if !trimmed.is_empty() {
        SilenceOutcome::Send(trimmed.to_string())
    } else {
        SilenceOutcome::Nothing
    }
}
