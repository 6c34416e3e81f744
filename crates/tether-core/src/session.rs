//! Ephemeral per-connection session records.
//!
//! A [`Session`] bridges one live [`ConnectionHandle`] to a durable
//! [`PlayerId`]. Sessions are shared as `Arc<Session>`; only the
//! [`SessionDirectory`](crate::SessionDirectory) inserts and removes them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::identity::{ConnectionHandle, PlayerId};
use crate::players::UniversalPlayer;

/// Placeholder used when the engine reports no display name.
pub const DEFAULT_DISPLAY_NAME: &str = "Unnamed";

/// Session state for one active connection.
#[derive(Debug)]
pub struct Session {
    handle: ConnectionHandle,
    id: PlayerId,
    name: RwLock<String>,
    address: String,
    admin: bool,
    language: Option<String>,
    loaded: AtomicBool,
    player: OnceLock<Arc<UniversalPlayer>>,
}

impl Session {
    /// Starts building a session for `handle` owned by `id`.
    pub fn builder(handle: ConnectionHandle, id: PlayerId) -> SessionBuilder {
        SessionBuilder {
            handle,
            id,
            name: None,
            address: String::new(),
            admin: false,
            language: None,
        }
    }

    /// The live connection handle.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// The persistent player id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Current display name.
    pub fn display_name(&self) -> String {
        self.name.read().clone()
    }

    /// Replaces the display name; blank names fall back to the placeholder.
    pub fn set_display_name(&self, name: &str) {
        *self.name.write() = normalize_name(Some(name));
    }

    /// Remote address as reported by the engine.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the engine considers this player an administrator.
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Language configured on the client, if reported.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Whether post-approval setup has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Marks the session loaded.
    ///
    /// Returns `true` only for the call that performed the false→true
    /// transition.
    pub fn mark_loaded(&self) -> bool {
        !self.loaded.swap(true, Ordering::AcqRel)
    }

    /// The bound universal player, if setup has reached that point.
    pub fn player(&self) -> Option<&Arc<UniversalPlayer>> {
        self.player.get()
    }

    /// Binds the universal player. The first binding wins.
    pub fn bind_player(&self, player: Arc<UniversalPlayer>) -> &Arc<UniversalPlayer> {
        self.player.get_or_init(|| player)
    }
}

/// Builder for [`Session`].
///
/// A session cannot be built without a persistent id; the id is taken by
/// [`Session::builder`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    handle: ConnectionHandle,
    id: PlayerId,
    name: Option<String>,
    address: String,
    admin: bool,
    language: Option<String>,
}

impl SessionBuilder {
    /// Sets the display name reported by the engine.
    pub fn name(mut self, name: Option<impl Into<String>>) -> Self {
        self.name = name.map(Into::into);
        self
    }

    /// Sets the remote address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Sets the administrator flag.
    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Sets the client's language.
    pub fn language(mut self, language: Option<impl Into<String>>) -> Self {
        self.language = language.map(Into::into).filter(|l: &String| !l.is_empty());
        self
    }

    /// Builds the session in the not-loaded state.
    pub fn build(self) -> Session {
        Session {
            handle: self.handle,
            id: self.id,
            name: RwLock::new(normalize_name(self.name.as_deref())),
            address: self.address,
            admin: self.admin,
            language: self.language,
            loaded: AtomicBool::new(false),
            player: OnceLock::new(),
        }
    }
}

fn normalize_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => DEFAULT_DISPLAY_NAME.to_string(),
    }
}
