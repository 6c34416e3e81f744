//! Error types for the Tether framework.

use thiserror::Error;

/// Errors raised when registering chat commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command name is empty or whitespace.
    #[error("command name is empty")]
    EmptyName,

    /// The name is reserved for server configuration.
    #[error("command '{0}' is restricted and cannot be registered")]
    Restricted(String),

    /// Another plugin already owns the name in this table.
    #[error("command '{name}' is already registered by plugin '{owner}'")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
        /// Plugin that owns it.
        owner: String,
    },
}

/// Result type for command registration.
pub type CommandResult<T> = Result<T, CommandError>;
