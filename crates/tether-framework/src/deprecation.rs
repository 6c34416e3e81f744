//! Deprecated hook aliases with a sunset date.
//!
//! A [`DeprecationShim`] keeps an old hook name working until its expiry.
//! Before expiry the alias is called with the same arguments as its
//! replacement; from the expiry instant on, the alias is never called and
//! costs nothing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::warn;

use tether_core::{HookCall, HookResult};

use crate::hooks::{LEGACY_ALIASES, legacy_alias_sunset};
use crate::registry::HookRegistry;

/// An expiring alias of a live hook.
#[derive(Debug)]
pub struct DeprecationShim {
    old_name: &'static str,
    new_name: &'static str,
    expiry: DateTime<Utc>,
    warn: bool,
    warned: Mutex<HashSet<String>>,
}

impl DeprecationShim {
    /// Creates a shim retiring `old_name` in favour of `new_name` at `expiry`.
    pub fn new(old_name: &'static str, new_name: &'static str, expiry: DateTime<Utc>) -> Self {
        Self {
            old_name,
            new_name,
            expiry,
            warn: true,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Enables or disables the once-per-plugin usage warning.
    pub fn with_warnings(mut self, warn: bool) -> Self {
        self.warn = warn;
        self
    }

    /// The retired name.
    pub fn old_name(&self) -> &'static str {
        self.old_name
    }

    /// The replacement name.
    pub fn new_name(&self) -> &'static str {
        self.new_name
    }

    /// The sunset instant.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Whether the alias is retired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    /// Calls the alias with `call`'s arguments, unless retired.
    pub async fn invoke(
        &self,
        now: DateTime<Utc>,
        registry: &HookRegistry,
        call: &HookCall,
    ) -> HookResult {
        if self.is_expired(now) {
            return HookResult::NoOpinion;
        }

        if self.warn {
            self.warn_subscribers(registry);
        }
        registry.call(call.renamed(self.old_name)).await
    }

    fn warn_subscribers(&self, registry: &HookRegistry) {
        let plugins = registry.plugins_for(self.old_name);
        if plugins.is_empty() {
            return;
        }

        let mut warned = self.warned.lock();
        for plugin in plugins {
            if warned.insert(plugin.clone()) {
                warn!(
                    plugin = %plugin,
                    hook = self.old_name,
                    replacement = self.new_name,
                    sunset = %self.expiry.format("%Y-%m-%d"),
                    "{plugin} is using deprecated hook {}, which will stop working on {}. Please ask the author to update to {}",
                    self.old_name,
                    self.expiry.format("%Y-%m-%d"),
                    self.new_name,
                );
            }
        }
    }
}

/// The standard set of legacy `OnUser*` aliases.
#[derive(Debug)]
pub struct LegacyAliases {
    /// `CanUserLogin`.
    pub login: DeprecationShim,
    /// `OnUserApproved`.
    pub approved: DeprecationShim,
    /// `OnUserChat`.
    pub chat: DeprecationShim,
    /// `OnUserCommand`.
    pub command: DeprecationShim,
    /// `OnUserConnected`.
    pub connected: DeprecationShim,
    /// `OnUserDisconnected`.
    pub disconnected: DeprecationShim,
}

impl LegacyAliases {
    /// Builds every alias with the standard sunset.
    pub fn new(warn: bool) -> Self {
        let [login, approved, chat, command, connected, disconnected] =
            LEGACY_ALIASES.map(|(old, new)| {
                DeprecationShim::new(old, new, legacy_alias_sunset()).with_warnings(warn)
            });
        Self {
            login,
            approved,
            chat,
            command,
            connected,
            disconnected,
        }
    }
}

impl Default for LegacyAliases {
    fn default() -> Self {
        Self::new(true)
    }
}
