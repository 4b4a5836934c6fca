//! Crate-level error type.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::engine::TrackError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the tracking pipeline and its I/O surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (invalid parameter or unreadable config file)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed cloud or mesh file
    #[error("{}:{line}: {message}", path.display())]
    Format {
        /// File the error was found in
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Cloud file with an extension no loader handles
    #[error("unsupported cloud format: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    /// Empty input that the pipeline cannot start from
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Tracking failure
    #[error(transparent)]
    Track(#[from] TrackError),
}
