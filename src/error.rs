//! Centralized error type for the consyn umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

use consyn_export::ExportError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] consyn_core::Error),

    #[error("Export: {0}")]
    Export(ExportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// Pipeline failures surfacing through assembly keep their original kind.
impl From<ExportError> for Error {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Pipeline(core) => Error::Core(core),
            other => Error::Export(other),
        }
    }
}

impl Error {
    /// Whether the error aborts the run it occurred in.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Core(e) => e.is_fatal(),
            Error::Export(_) | Error::Io(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
