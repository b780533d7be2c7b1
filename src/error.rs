//! Typed failures surfaced by the engine.

use thiserror::Error;

use crate::schema::Role;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Every failure the engine reports to its caller.
///
/// A single bad timestamp is never one of these: the temporal parser recovers
/// locally and the affected row simply drops out of duration-based numbers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Could not parse CSV file with known delimiters: {path}")]
    UnparseableFile { path: String },

    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("No data loaded")]
    NoDataLoaded,

    #[error("Could not identify a {role} column")]
    Schema { role: Role },

    #[error("Unknown analysis type: {0}")]
    UnknownAnalysis(String),

    #[error("No filters provided")]
    NoFilters,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// HTTP-style status a collaborator should report for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NoDataLoaded
            | EngineError::FileNotFound(_)
            | EngineError::ColumnNotFound(_) => 404,
            EngineError::UnparseableFile { .. }
            | EngineError::UnsupportedFormat { .. }
            | EngineError::Schema { .. }
            | EngineError::UnknownAnalysis(_)
            | EngineError::NoFilters => 400,
            EngineError::Io(_) => 500,
        }
    }
}
