//! Error types shared across the Tether core.
//!
//! Only directory precondition violations are surfaced to callers as
//! actionable failures. Handler faults are carried as values so the dispatch
//! layer can log them and degrade to "no opinion".

use thiserror::Error;

use crate::identity::{ConnectionHandle, PlayerId};

// =============================================================================
// Directory Errors
// =============================================================================

/// Errors raised by [`SessionDirectory`](crate::SessionDirectory) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The connection handle is already mapped to a live session.
    #[error("connection {0} is already registered")]
    DuplicateHandle(ConnectionHandle),

    /// The persistent id is already bound to a different live connection.
    #[error("player {id} is already registered on connection {existing}")]
    DuplicateIdentity {
        /// The persistent id being registered.
        id: PlayerId,
        /// The connection currently holding that id.
        existing: ConnectionHandle,
    },
}

// =============================================================================
// Handler Faults
// =============================================================================

/// A failure raised by a single hook or command handler.
///
/// Faults never escape the dispatcher; they are logged and the failing
/// subscriber is treated as having returned no opinion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFault {
    /// The handler returned an error value.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked while running.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerFault {
    /// Creates a fault from any displayable error.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }

    /// Creates a fault from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_str_panic() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            HandlerFault::from_panic(payload.as_ref()),
            HandlerFault::Panicked("boom".into())
        );
    }

    #[test]
    fn test_fault_from_string_panic() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bad state"));
        assert_eq!(
            HandlerFault::from_panic(payload.as_ref()),
            HandlerFault::Panicked("bad state".into())
        );
    }

    #[test]
    fn test_duplicate_identity_message() {
        let err = DirectoryError::DuplicateIdentity {
            id: PlayerId(76561198000000001),
            existing: ConnectionHandle(4),
        };
        assert_eq!(
            err.to_string(),
            "player 76561198000000001 is already registered on connection #4"
        );
    }
}
