//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Replay file could not be read
    #[error("failed to open replay file {path:?}: {source}")]
    ReplayOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A replay line is not a valid drive record
    #[error("invalid replay record at line {line}: {message}")]
    ReplayRecord { line: usize, message: String },

    /// Replay file holds no records
    #[error("replay file {path:?} contains no records")]
    ReplayEmpty { path: PathBuf },

    /// Frame payload file referenced by a replay record is unreadable
    #[error("failed to load frame data {path:?}: {source}")]
    FrameData {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Route shape expands to no waypoints
    #[error("simulated route has no waypoints")]
    EmptyRoute,

    /// Source id registered twice
    #[error("source {source_id} is already registered")]
    DuplicateSource { source_id: String },
}

impl IngestionError {
    pub fn replay_record(line: usize, message: impl Into<String>) -> Self {
        Self::ReplayRecord {
            line,
            message: message.into(),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
