//! Error types for consyn-export

use std::io;

use consyn_core::MediaFileId;
use thiserror::Error;

/// Export error type
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Buffer shape does not match what is being written
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    /// A unit arrived for an output that was never registered
    #[error("No output registered for {0}")]
    UnknownOutput(MediaFileId),

    /// Encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Failure upstream of assembly
    #[error(transparent)]
    Pipeline(#[from] consyn_core::Error),
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ExportError::Io(io),
            other => ExportError::Encoding(other.to_string()),
        }
    }
}
