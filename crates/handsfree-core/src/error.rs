use thiserror::Error;

/// Top-level error type for the hands-free system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for HandsFreeError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandsFreeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for HandsFreeError {
    fn from(err: toml::de::Error) -> Self {
        HandsFreeError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HandsFreeError {
    fn from(err: toml::ser::Error) -> Self {
        HandsFreeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HandsFreeError {
    fn from(err: serde_json::Error) -> Self {
        HandsFreeError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for hands-free operations.
pub type Result<T> = std::result::Result<T, HandsFreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(HandsFreeError, &str)> = vec![
            (
                HandsFreeError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                HandsFreeError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
            (
                HandsFreeError::Engine("not-allowed".to_string()),
                "Engine error: not-allowed",
            ),
            (
                HandsFreeError::Session("closed".to_string()),
                "Session error: closed",
            ),
            (HandsFreeError::ShuttingDown, "Shutdown in progress"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: HandsFreeError = io_err.into();
        assert!(matches!(err, HandsFreeError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: HandsFreeError = parsed.unwrap_err().into();
        assert!(matches!(err, HandsFreeError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: HandsFreeError = parsed.unwrap_err().into();
        assert!(matches!(err, HandsFreeError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
