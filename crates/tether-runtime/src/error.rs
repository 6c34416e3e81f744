//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use tether_core::DirectoryError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The dispatcher refused to register a session.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The event loop is gone; the event was not delivered.
    #[error("Runtime is not accepting events")]
    Closed,

    /// The event loop dropped the event without replying.
    #[error("Runtime dropped the event before responding")]
    NoResponse,

    /// `run` was called while the event loop was already running.
    #[error("Runtime is already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
