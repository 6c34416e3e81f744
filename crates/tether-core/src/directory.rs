//! Live session directory.
//!
//! [`SessionDirectory`] keeps the two indexes that connect the engine's view of
//! a player (a [`ConnectionHandle`]) to the persistent view (a [`PlayerId`]).
//! Both indexes live behind a single lock so they can never disagree.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::{ConnectionHandle, PlayerId};
use crate::session::Session;

#[derive(Debug, Default)]
struct Indexes {
    by_handle: HashMap<ConnectionHandle, Arc<Session>>,
    by_id: HashMap<PlayerId, ConnectionHandle>,
}

/// Bidirectional map of live connections to sessions.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    inner: RwLock<Indexes>,
}

impl SessionDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session` under its own handle.
    ///
    /// Never overwrites an existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::DuplicateHandle`] if the handle is taken and
    /// [`DirectoryError::DuplicateIdentity`] if the persistent id is bound to
    /// another live connection.
    pub fn register(&self, session: Arc<Session>) -> DirectoryResult<Arc<Session>> {
        let handle = session.handle();
        let id = session.id();
        let mut inner = self.inner.write();

        if inner.by_handle.contains_key(&handle) {
            return Err(DirectoryError::DuplicateHandle(handle));
        }
        if let Some(&existing) = inner.by_id.get(&id) {
            return Err(DirectoryError::DuplicateIdentity { id, existing });
        }

        inner.by_id.insert(id, handle);
        inner.by_handle.insert(handle, Arc::clone(&session));
        debug!(%handle, player_id = %id, "Session registered");
        Ok(session)
    }

    /// Removes the session mapped to `handle` along with its reverse mapping.
    pub fn unregister(&self, handle: ConnectionHandle) -> Option<Arc<Session>> {
        let mut inner = self.inner.write();
        let session = inner.by_handle.remove(&handle)?;
        if inner.by_id.get(&session.id()) == Some(&handle) {
            inner.by_id.remove(&session.id());
        }
        debug!(%handle, player_id = %session.id(), "Session unregistered");
        Some(session)
    }

    /// Removes whatever session `id` currently maps to.
    pub fn unregister_identity(&self, id: PlayerId) -> Option<Arc<Session>> {
        let mut inner = self.inner.write();
        let handle = inner.by_id.remove(&id)?;
        let session = inner.by_handle.remove(&handle);
        trace!(player_id = %id, %handle, "Identity mapping removed");
        session
    }

    /// Looks up a session by connection handle.
    pub fn find_by_handle(&self, handle: ConnectionHandle) -> Option<Arc<Session>> {
        self.inner.read().by_handle.get(&handle).cloned()
    }

    /// Looks up a session by persistent id.
    pub fn find_by_persistent_id(&self, id: PlayerId) -> Option<Arc<Session>> {
        let inner = self.inner.read();
        inner
            .by_id
            .get(&id)
            .and_then(|handle| inner.by_handle.get(handle))
            .cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().by_handle.len()
    }

    /// Returns `true` when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_handle.is_empty()
    }

    /// Snapshot of every live session.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner.read().by_handle.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(handle: u64, id: u64) -> Arc<Session> {
        Arc::new(
            Session::builder(ConnectionHandle(handle), PlayerId(id))
                .name(Some("Alice"))
                .build(),
        )
    }

    #[test]
    fn test_register_then_unregister_clears_both_indexes() {
        let directory = SessionDirectory::new();
        directory.register(session(1, 100)).unwrap();
        assert!(directory.find_by_handle(ConnectionHandle(1)).is_some());
        assert!(directory.find_by_persistent_id(PlayerId(100)).is_some());

        let removed = directory.unregister(ConnectionHandle(1)).unwrap();
        assert_eq!(removed.id(), PlayerId(100));
        assert!(directory.find_by_handle(ConnectionHandle(1)).is_none());
        assert!(directory.find_by_persistent_id(PlayerId(100)).is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_duplicate_handle_is_rejected() {
        let directory = SessionDirectory::new();
        directory.register(session(1, 100)).unwrap();

        let err = directory.register(session(1, 200)).unwrap_err();
        assert_eq!(err, DirectoryError::DuplicateHandle(ConnectionHandle(1)));
        assert_eq!(
            directory.find_by_handle(ConnectionHandle(1)).unwrap().id(),
            PlayerId(100)
        );
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let directory = SessionDirectory::new();
        directory.register(session(1, 100)).unwrap();

        let err = directory.register(session(2, 100)).unwrap_err();
        assert_eq!(
            err,
            DirectoryError::DuplicateIdentity {
                id: PlayerId(100),
                existing: ConnectionHandle(1),
            }
        );
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let directory = SessionDirectory::new();
        assert!(directory.unregister(ConnectionHandle(9)).is_none());
        assert!(directory.unregister_identity(PlayerId(9)).is_none());
    }

    #[test]
    fn test_unregister_identity() {
        let directory = SessionDirectory::new();
        directory.register(session(3, 300)).unwrap();
        directory.register(session(4, 400)).unwrap();

        let removed = directory.unregister_identity(PlayerId(300)).unwrap();
        assert_eq!(removed.handle(), ConnectionHandle(3));
        assert!(directory.find_by_handle(ConnectionHandle(3)).is_none());
        assert_eq!(directory.sessions().len(), 1);
    }
}
