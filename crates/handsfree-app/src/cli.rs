//! CLI argument definitions for the hands-free console.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use handsfree_core::config::HandsFreeConfig;

/// Hands-free voice session driven from the terminal.
#[derive(Parser, Debug)]
#[command(name = "handsfree", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Silence in milliseconds before the transcript is interpreted.
    #[arg(short = 's', long = "silence-ms")]
    pub silence_ms: Option<u64>,

    /// Recognition locale, e.g. en-US.
    #[arg(long = "locale")]
    pub locale: Option<String>,

    /// Keep ordinary text instead of submitting it after silence.
    #[arg(long = "no-auto-send")]
    pub no_auto_send: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HANDSFREE_CONFIG env var > ~/.handsfree/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HANDSFREE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config: &HandsFreeConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.general.log_level.clone())
    }

    /// Fold the command-line overrides into a loaded config.
    pub fn apply_overrides(&self, config: &mut HandsFreeConfig) {
        if let Some(ms) = self.silence_ms {
            config.session.silence_ms = ms;
        }
        if let Some(ref locale) = self.locale {
            config.engine.locale = locale.clone();
        }
        if self.no_auto_send {
            config.session.auto_send = false;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".handsfree").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".handsfree").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "handsfree",
            "--config",
            "/tmp/hf.toml",
            "-l",
            "debug",
            "--silence-ms",
            "1500",
            "--locale",
            "de-DE",
            "--no-auto-send",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/hf.toml"));
        assert_eq!(args.silence_ms, Some(1500));
        assert!(args.no_auto_send);

        let mut config = HandsFreeConfig::default();
        assert_eq!(args.resolve_log_level(&config), "debug");
        args.apply_overrides(&mut config);
        assert_eq!(config.session.silence_ms, 1500);
        assert_eq!(config.engine.locale, "de-DE");
        assert!(!config.session.auto_send);
    }

    #[test]
    fn test_no_flags_keep_config_values() {
        let args = CliArgs::parse_from(["handsfree"]);
        let mut config = HandsFreeConfig::default();
        config.general.log_level = "warn".to_string();
        args.apply_overrides(&mut config);

        assert_eq!(args.resolve_log_level(&config), "warn");
        assert_eq!(config.session, HandsFreeConfig::default().session);
        assert_eq!(config.engine, HandsFreeConfig::default().engine);
    }
}
