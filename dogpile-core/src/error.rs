use crate::CodecError;
use dogpile_retry::RetryError;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors returned by [`Cache`](crate::Cache) implementations and the
/// coordination layer built on top of them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The key is not stored. The only error that makes
    /// [`fetch_or_save`](crate::fetch_or_save) build a value.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// Connectivity, I/O or any other fault reported by a backend.
    #[error("cache backend error: {message}")]
    Backend { message: String },

    /// The backend rejected the configured credentials. Retrying won't help.
    #[error("cache backend rejected credentials: {message}")]
    Unauthorized { message: String },

    #[error("cache codec error: {0}")]
    Codec(#[from] CodecError),

    /// No factory is registered under the requested backend name.
    #[error("cache type {0} not supported")]
    UnsupportedBackend(String),

    /// Gave up waiting for another caller building the same key.
    #[error("timed out after {waited:?} waiting for the lock on {key}")]
    LockTimeout { key: String, waited: Duration },
}

impl CacheError {
    pub fn not_found(key: impl Into<String>) -> Self {
        CacheError::NotFound { key: key.into() }
    }

    pub fn backend(message: impl std::fmt::Display) -> Self {
        CacheError::Backend {
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }

    /// Whether the same call may succeed later without any change on our side.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CacheError::Backend { .. }
                | CacheError::NotFound { .. }
                | CacheError::LockTimeout { .. }
        )
    }
}

/// Errors returned by [`initialize`](crate::initialize).
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The backend could not be constructed.
    #[error("failed to create {backend} cache: {source}")]
    Create {
        backend: String,
        #[source]
        source: CacheError,
    },

    /// The backend never answered a ping within the retry budget, or refused
    /// the connection in a way that made retrying pointless.
    #[error("cache at {address} is not reachable: {source}")]
    Unreachable {
        /// The address with any password masked.
        address: String,
        #[source]
        source: RetryError<CacheError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(CacheError::not_found("k").is_not_found());
        assert!(!CacheError::backend("down").is_not_found());

        assert!(CacheError::backend("connection reset").is_retryable());
        assert!(!CacheError::UnsupportedBackend("etcd".into()).is_retryable());
        assert!(!CacheError::Unauthorized {
            message: "WRONGPASS".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CacheError::UnsupportedBackend("etcd".into()).to_string(),
            "cache type etcd not supported"
        );
        assert_eq!(
            CacheError::not_found("user:1").to_string(),
            "key not found: user:1"
        );
    }

    #[test]
    fn test_init_error_keeps_redacted_address() {
        let err = InitError::Unreachable {
            address: "redis://:xxxxx@cache:6379".into(),
            source: RetryError::Timeout {
                attempts: 4,
                last_error: Some(CacheError::backend("refused")),
            },
        };
        assert_eq!(
            err.to_string(),
            "cache at redis://:xxxxx@cache:6379 is not reachable: retry timeout after 4 attempts"
        );
    }
}
