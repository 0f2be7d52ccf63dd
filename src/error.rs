// src/error.rs

//! Error types for the transaction queue

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the queue and its collaborators
///
/// Problems with the queued set itself (missing packages, conflicts, cycles)
/// are not errors; they are reported through [`crate::queue::Issue`].
#[derive(Error, Debug)]
pub enum Error {
    /// A local package file could not be queued
    #[error("Invalid local package '{}': {reason}", path.display())]
    InvalidLocalPackage { path: PathBuf, reason: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed input (versions, fixtures)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an `InvalidLocalPackage` error for `path`
    pub fn invalid_local(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidLocalPackage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
