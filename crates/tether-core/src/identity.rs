//! Identity primitives and the persistent-identity registry boundary.
//!
//! [`ConnectionHandle`] names a live engine connection and is only meaningful
//! while that connection exists. [`PlayerId`] is the durable identity used for
//! permissions, bans and cross-session correlation.
//!
//! Permission-group storage and ban persistence belong to an external
//! collaborator reached through [`IdentityRegistry`]. [`MemoryIdentityRegistry`]
//! is a process-local implementation used when no store is injected.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque, engine-scoped handle of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(pub u64);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Durable 64-bit player identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// =============================================================================
// IdentityRegistry
// =============================================================================

/// Persistent-identity bookkeeping consumed by the dispatcher.
///
/// Implementations must make group additions idempotent: adding a group the
/// player already belongs to is a no-op.
pub trait IdentityRegistry: Send + Sync {
    /// Whether the backing store has finished loading.
    ///
    /// Identity sync on connect is skipped while this returns `false`.
    fn is_loaded(&self) -> bool {
        true
    }

    /// Caches the latest display name for an identity.
    fn update_nickname(&self, id: PlayerId, name: &str);

    /// Returns the cached display name, if any.
    fn nickname(&self, id: PlayerId) -> Option<String>;

    /// Returns whether the identity belongs to `group`.
    fn user_has_group(&self, id: PlayerId, group: &str) -> bool;

    /// Adds the identity to `group`.
    fn add_user_group(&self, id: PlayerId, group: &str);

    /// Removes the identity from `group`.
    fn remove_user_group(&self, id: PlayerId, group: &str);

    /// Returns whether the identity is banned.
    fn is_banned(&self, id: PlayerId) -> bool;

    /// Sets or clears the ban flag.
    fn set_banned(&self, id: PlayerId, banned: bool);

    /// Returns the stored language preference.
    fn language(&self, id: PlayerId) -> Option<String>;

    /// Stores a language preference.
    fn set_language(&self, id: PlayerId, language: &str);
}

/// Snapshot of everything the registry knows about one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Last known display name.
    pub nickname: Option<String>,
    /// Permission groups.
    pub groups: BTreeSet<String>,
    /// Ban flag.
    pub banned: bool,
    /// Language preference.
    pub language: Option<String>,
}

/// In-memory [`IdentityRegistry`].
#[derive(Debug, Default)]
pub struct MemoryIdentityRegistry {
    records: RwLock<HashMap<PlayerId, IdentityRecord>>,
}

impl MemoryIdentityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record for `id`.
    pub fn record(&self, id: PlayerId) -> Option<IdentityRecord> {
        self.records.read().get(&id).cloned()
    }

    /// Returns the number of identities with a record.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no identity has a record.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn with_record<R>(&self, id: PlayerId, f: impl FnOnce(&mut IdentityRecord) -> R) -> R {
        let mut records = self.records.write();
        f(records.entry(id).or_default())
    }
}

impl IdentityRegistry for MemoryIdentityRegistry {
    fn update_nickname(&self, id: PlayerId, name: &str) {
        self.with_record(id, |r| r.nickname = Some(name.to_string()));
    }

    fn nickname(&self, id: PlayerId) -> Option<String> {
        self.records.read().get(&id).and_then(|r| r.nickname.clone())
    }

    fn user_has_group(&self, id: PlayerId, group: &str) -> bool {
        self.records
            .read()
            .get(&id)
            .is_some_and(|r| r.groups.contains(&group.to_lowercase()))
    }

    fn add_user_group(&self, id: PlayerId, group: &str) {
        let added = self.with_record(id, |r| r.groups.insert(group.to_lowercase()));
        if added {
            trace!(player_id = %id, group = %group, "Added identity to group");
        }
    }

    fn remove_user_group(&self, id: PlayerId, group: &str) {
        self.with_record(id, |r| r.groups.remove(&group.to_lowercase()));
    }

    fn is_banned(&self, id: PlayerId) -> bool {
        self.records.read().get(&id).is_some_and(|r| r.banned)
    }

    fn set_banned(&self, id: PlayerId, banned: bool) {
        self.with_record(id, |r| r.banned = banned);
    }

    fn language(&self, id: PlayerId) -> Option<String> {
        self.records
            .read()
            .get(&id)
            .and_then(|r| r.language.clone())
            .filter(|l| !l.is_empty())
    }

    fn set_language(&self, id: PlayerId, language: &str) {
        self.with_record(id, |r| r.language = Some(language.to_string()));
    }
}
