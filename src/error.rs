//! Error types for the progress engine.

use thiserror::Error;

/// Errors surfaced by progress operations.
#[derive(Error, Debug)]
pub enum ProgressError {
    /// Writing or flushing the error stream failed with something other than
    /// an interrupted system call (those are retried, see `term`).
    #[error("Failed to write progress output: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to load config: {reason}")]
    ConfigError { reason: String },
}

impl From<figment::Error> for ProgressError {
    fn from(e: figment::Error) -> Self {
        ProgressError::ConfigError {
            reason: e.to_string(),
        }
    }
}
