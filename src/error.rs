use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LiveSocksError {
    // Session errors
    SessionNotFound(String),

    // Connections errors
    ConnectionClosed,

    // Storage errors
    StorageError(String),

    // Messages errors
    MessageParseError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for LiveSocksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for LiveSocksError {}

impl From<serde_json::Error> for LiveSocksError {
    fn from(err: serde_json::Error) -> Self {
        LiveSocksError::MessageParseError(err.to_string())
    }
}

impl From<std::io::Error> for LiveSocksError {
    fn from(err: std::io::Error) -> Self {
        LiveSocksError::StorageError(err.to_string())
    }
}

// Generic result type for LiveSocks
pub type Result<T> = std::result::Result<T, LiveSocksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            LiveSocksError::SessionNotFound("abc".to_string()).to_string(),
            "Session not found: abc"
        );
        assert_eq!(
            LiveSocksError::ConnectionClosed.to_string(),
            "Connection closed unexpectedly"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted: LiveSocksError = err.into();
        assert!(matches!(converted, LiveSocksError::MessageParseError(_)));
    }
}
