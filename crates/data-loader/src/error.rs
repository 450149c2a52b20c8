//! Errors raised while reading shop data files or querying a store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Data file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `::`-separated record that could not be split or converted
    #[error("{file}:{line}: {reason}")]
    MalformedLine {
        file: String,
        line: usize,
        reason: String,
    },

    /// A well-formed value outside its legal range (negative price,
    /// non-finite weight, out-of-range timestamp)
    #[error("Invalid {field} value {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// The backing store could not serve the request at all.
    ///
    /// Callers treat this as an infrastructure failure rather than an
    /// empty result.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, DataLoadError>;
