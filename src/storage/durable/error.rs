use thiserror::Error;

#[derive(Error, Debug)]
/// Errors from snapshot backends and snapshot decoding.
///
/// The durable store never surfaces these from its data operations: a failed
/// load is treated as an empty snapshot and a failed write is retried on the
/// next persist.
pub enum SnapshotError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot was written by an unknown format version.
    #[error("unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the record.
        found: u32,
        /// Newest version this build reads.
        supported: u32,
    },
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err.to_string())
    }
}

/// Convenience result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
