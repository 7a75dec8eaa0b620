//! Cache error types
//!
//! These errors never cross the `KeyValueCache` boundary; they are produced by
//! backends and configuration loading and are logged where they stop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Short label used for the `error_type` metric dimension
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Redis(_) => "redis",
            CacheError::Serialization(_) => "serialization",
            CacheError::Unavailable(_) => "unavailable",
            CacheError::Configuration(_) => "configuration",
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Backend unavailable: connection refused");
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert_eq!(err.kind(), "serialization");
    }
}
