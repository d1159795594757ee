//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("failed to parse {name}='{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A setting that must be positive was zero.
    #[error("{name} must be greater than zero")]
    ZeroValue { name: &'static str },

    /// Eviction fraction outside `(0, 1]`.
    #[error("eviction fraction {value} must be in (0, 1]")]
    InvalidFraction { value: f64 },

    #[error("entry estimate for namespace '{namespace}' must be greater than zero")]
    ZeroEntryEstimate { namespace: String },
}
