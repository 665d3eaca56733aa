//! Error type shared by the telescope and neutron-bookkeeping modules.

use std::path::PathBuf;

use lise_compute::ComputeError;
use lise_tables::TableError;
use thiserror::Error;

/// Errors that can occur while generating, recording or reading events.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to parse beam: {0}")]
    BeamParse(String),

    #[error("Inconsistent beam: {found} (generator already set to {expected})")]
    InconsistentBeam { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Track {track} references parent {parent}, which was never recorded")]
    UnknownParent { track: u32, parent: u32 },

    #[error("Output file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: parse error at line {line}: {message}")]
    Format {
        path: String,
        line: usize,
        message: String,
    },

    #[error("JSON serialisation error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("Output table lock poisoned by a panicking worker")]
    Poisoned,
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
