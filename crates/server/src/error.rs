//! Engine error taxonomy.
//!
//! Only [`EngineError::SourceUnavailable`] ever reaches callers of
//! `get_recommendations`; everything else is recovered by falling back or
//! swallowed after logging.

use data_loader::DataLoadError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The behavior log or catalog could not be read
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(#[from] DataLoadError),

    /// Scoring panicked or otherwise aborted
    #[error("Scoring failed: {0}")]
    Computation(String),

    #[error("Scoring timed out after {0:?}")]
    Timeout(Duration),

    /// Writing the recommendation log or a behavior event failed
    #[error("Failed to persist {what}: {reason}")]
    Logging { what: &'static str, reason: String },

    #[error("Unknown recommendation type: {0}")]
    UnknownStrategy(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
