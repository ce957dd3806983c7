use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HandsFreeError, Result};

/// Top-level configuration for the hands-free voice session.
///
/// Loaded from `~/.handsfree/config.toml` by default. Every section falls
/// back to its defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandsFreeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl HandsFreeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HandsFreeConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.silence_ms == 0 {
            return Err(HandsFreeError::Config(
                "session.silence_ms must be greater than zero".to_string(),
            ));
        }
        if self.engine.locale.trim().is_empty() {
            return Err(HandsFreeError::Config(
                "engine.locale must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Hands-free session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whether hands-free mode starts enabled. Flipping it off forces teardown.
    pub enabled: bool,
    /// Silence in milliseconds after the last final result before the
    /// transcript is interpreted.
    pub silence_ms: u64,
    /// Submit ordinary (non-command) text when the silence deadline expires.
    pub auto_send: bool,
    /// Spoken replies. Consumed by the playback layer, not by the session.
    pub enable_tts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            silence_ms: 2500,
            auto_send: true,
            enable_tts: false,
        }
    }
}

/// Options applied to the recognition engine when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep recognizing across pauses in speech.
    pub continuous: bool,
    /// Report provisional results before they are final.
    pub interim_results: bool,
    /// BCP 47 locale tag, e.g. "en-US".
    pub locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            locale: "en-US".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = HandsFreeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.session.enabled);
        assert_eq!(config.session.silence_ms, 2500);
        assert!(config.session.auto_send);
        assert!(!config.session.enable_tts);
        assert!(config.engine.continuous);
        assert!(config.engine.interim_results);
        assert_eq!(config.engine.locale, "en-US");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[session]
enabled = false
silence_ms = 1200
auto_send = false
enable_tts = true

[engine]
continuous = false
interim_results = false
locale = "de-DE"
"#;
        let file = create_temp_config(content);
        let config = HandsFreeConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(!config.session.enabled);
        assert_eq!(config.session.silence_ms, 1200);
        assert!(!config.session.auto_send);
        assert!(config.session.enable_tts);
        assert!(!config.engine.continuous);
        assert!(!config.engine.interim_results);
        assert_eq!(config.engine.locale, "de-DE");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[session]\nsilence_ms = 900\n");
        let config = HandsFreeConfig::load(file.path()).unwrap();
        assert_eq!(config.session.silence_ms, 900);
        assert!(config.session.auto_send);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = HandsFreeConfig::load(file.path()).unwrap();
        assert_eq!(config, HandsFreeConfig::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[session\nsilence_ms = ");
        let err = HandsFreeConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, HandsFreeError::Config(_)));
    }

    #[test]
    fn test_load_rejects_zero_silence() {
        let file = create_temp_config("[session]\nsilence_ms = 0\n");
        let err = HandsFreeConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("silence_ms"));
    }

    #[test]
    fn test_validate_rejects_blank_locale() {
        let mut config = HandsFreeConfig::default();
        config.engine.locale = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = HandsFreeConfig::load_or_default(Path::new("/nonexistent/handsfree.toml"));
        assert_eq!(config, HandsFreeConfig::default());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = HandsFreeConfig::default();
        config.session.silence_ms = 4000;
        config.engine.locale = "fr-FR".to_string();
        config.save(&path).unwrap();

        let reloaded = HandsFreeConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
