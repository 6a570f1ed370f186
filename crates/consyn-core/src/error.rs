//! Error types for consyn-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::UnitId;

/// Error type shared by the segmentation, selection and resynthesis pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A frame source could not open, read or seek a file.
    #[error("Source unreadable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// The feature extractor had too little signal to describe a unit.
    #[error("Features unavailable for unit at channel {channel}, position {position}")]
    FeatureUnavailable { channel: usize, position: usize },

    /// Nearest-neighbour or random selection had nothing to choose from.
    #[error("No candidate units to select from")]
    NoCandidates,

    /// A zero-length unit was produced (normally filtered, never persisted).
    #[error("Degenerate unit at channel {channel}, position {position}")]
    DegenerateUnit { channel: usize, position: usize },

    /// Clustering hit its iteration cap before the centroids settled.
    #[error("Clustering did not converge after {iterations} iterations")]
    ClusteringNonConvergent { iterations: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Feature vector full: {max} slots")]
    FeatureSlotsExceeded { max: usize },

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Media file not found: {0}")]
    MediaFileNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::SourceUnreadable`] from any displayable cause.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error aborts the run it occurred in.
    ///
    /// Skipped units and filtered slices are reported but never stop a pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::FeatureUnavailable { .. }
                | Error::DegenerateUnit { .. }
                | Error::ClusteringNonConvergent { .. }
        )
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
