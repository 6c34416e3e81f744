//! Universal player abstraction.
//!
//! Universal-tier handlers never see engine sessions. They receive a
//! [`UniversalPlayer`], which outlives individual connections: the
//! [`PlayerManager`] remembers every identity that has joined and tracks which
//! of them are currently connected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::identity::{ConnectionHandle, PlayerId};
use crate::session::Session;

// =============================================================================
// UniversalPlayer
// =============================================================================

/// Engine-agnostic view of a player, connected or not.
#[derive(Debug)]
pub struct UniversalPlayer {
    id: PlayerId,
    name: RwLock<String>,
    address: RwLock<Option<String>>,
    connection: RwLock<Option<ConnectionHandle>>,
}

impl UniversalPlayer {
    /// Creates a disconnected player record.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: RwLock::new(name.into()),
            address: RwLock::new(None),
            connection: RwLock::new(None),
        }
    }

    /// The persistent id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The id as the string form universal plugins key on.
    pub fn id_string(&self) -> String {
        self.id.to_string()
    }

    /// Last known name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Last known address.
    pub fn address(&self) -> Option<String> {
        self.address.read().clone()
    }

    /// The live connection, if connected.
    pub fn connection(&self) -> Option<ConnectionHandle> {
        *self.connection.read()
    }

    /// Whether the player currently has a live connection.
    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    fn rename(&self, name: &str) {
        *self.name.write() = name.to_string();
    }
}

impl PartialEq for UniversalPlayer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UniversalPlayer {}

impl fmt::Display for UniversalPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player[{}, {}]", self.id, self.name.read())
    }
}

// =============================================================================
// PlayerManager
// =============================================================================

/// Registry of known and connected universal players.
#[derive(Debug, Default)]
pub struct PlayerManager {
    known: RwLock<HashMap<PlayerId, Arc<UniversalPlayer>>>,
}

impl PlayerManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` is attempting to join, creating or renaming its record.
    pub fn player_join(&self, id: PlayerId, name: &str) -> Arc<UniversalPlayer> {
        let mut known = self.known.write();
        if let Some(player) = known.get(&id) {
            if player.name() != name {
                debug!(player_id = %id, old = %player.name(), new = %name, "Known player renamed");
                player.rename(name);
            }
            return Arc::clone(player);
        }

        debug!(player_id = %id, name = %name, "New player recorded");
        let player = Arc::new(UniversalPlayer::new(id, name));
        known.insert(id, Arc::clone(&player));
        player
    }

    /// Marks the session's identity connected and returns its player.
    pub fn player_connected(&self, session: &Session) -> Arc<UniversalPlayer> {
        let player = self.player_join(session.id(), &session.display_name());
        *player.address.write() = Some(session.address().to_string());
        *player.connection.write() = Some(session.handle());
        player
    }

    /// Marks the session's identity disconnected.
    ///
    /// A newer connection for the same identity is left untouched.
    pub fn player_disconnected(&self, session: &Session) {
        if let Some(player) = self.known.read().get(&session.id()) {
            let mut connection = player.connection.write();
            if *connection == Some(session.handle()) {
                *connection = None;
            }
        }
    }

    /// Finds a known player by persistent id.
    pub fn find_by_id(&self, id: PlayerId) -> Option<Arc<UniversalPlayer>> {
        self.known.read().get(&id).cloned()
    }

    /// Finds known players whose name contains `fragment` (case-insensitive)
    /// or whose id string equals it.
    pub fn find(&self, fragment: &str) -> Vec<Arc<UniversalPlayer>> {
        let needle = fragment.to_lowercase();
        self.known
            .read()
            .values()
            .filter(|p| p.id_string() == fragment || p.name().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// All currently connected players.
    pub fn connected(&self) -> Vec<Arc<UniversalPlayer>> {
        self.known
            .read()
            .values()
            .filter(|p| p.is_connected())
            .cloned()
            .collect()
    }

    /// Number of known players.
    pub fn known_count(&self) -> usize {
        self.known.read().len()
    }

    /// Number of connected players.
    pub fn connected_count(&self) -> usize {
        self.known.read().values().filter(|p| p.is_connected()).count()
    }
}
