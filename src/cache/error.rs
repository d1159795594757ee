use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the cache manager.
pub enum CacheError {
    /// Namespace configuration cannot be honored.
    #[error("invalid cache configuration: {reason}")]
    InvalidConfig {
        /// Error message.
        reason: String,
    },

    /// Namespace contains the composite-key separator.
    #[error("invalid namespace '{namespace}': must be non-empty and must not contain the key separator")]
    InvalidNamespace {
        /// Offending namespace.
        namespace: String,
    },
}

/// Convenience result type for cache manager operations.
pub type CacheResult<T> = Result<T, CacheError>;
