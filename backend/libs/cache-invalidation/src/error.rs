//! Error types for cross-context invalidation

use thiserror::Error;

/// Cache invalidation errors
#[derive(Error, Debug)]
pub enum InvalidationError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid message format received
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// The broadcast transport does not exist in this environment
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The channel was torn down
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InvalidationError::InvalidMessage("missing event_kind".to_string());
        assert_eq!(err.to_string(), "Invalid message format: missing event_kind");

        let err = InvalidationError::TransportUnavailable("no broadcast channel".to_string());
        assert_eq!(err.to_string(), "Transport unavailable: no broadcast channel");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: InvalidationError = json_err.into();
        assert!(matches!(err, InvalidationError::Serialization(_)));
    }
}
