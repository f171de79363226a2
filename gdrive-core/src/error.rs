//! Error types for gdrive-core.

use std::path::PathBuf;
use thiserror::Error;

/// Every way a single drive operation can fail. None of them are retried.
#[derive(Error, Debug)]
pub enum DriveError {
    /// The remote service has no record with this id.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The local file or directory to send does not exist.
    #[error("Local path not found: {}", .0.display())]
    LocalPathNotFound(PathBuf),

    /// A remote name that cannot be used as a single local file name
    /// (empty, `.`, `..`, absolute, or containing a separator).
    #[error("Remote name cannot be used as a local file name: {0:?}")]
    UnsafeName(String),

    /// The remote service answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriveError>;
