//! Tiered hook invocation.
//!
//! One canonical event is announced up to three times: once under its
//! game-specific hook, once under its universal hook and once under a
//! deprecated alias of the universal hook. Every tier runs; precedence only
//! decides which result is returned.
//!
//! ```rust,ignore
//! let results = HookInvocation::new("chat")
//!     .specific(HookCall::new(ON_PLAYER_CHAT, vec![session.into(), msg.into()]))
//!     .universal(HookCall::new(ON_PLAYER_CHAT, vec![player.into(), msg.into()]))
//!     .deprecated(&aliases.chat)
//!     .invoke(&registry, clock.now())
//!     .await;
//! let merged = results.merged();
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, debug_span};

use tether_core::{HookCall, HookResult};

use crate::deprecation::DeprecationShim;
use crate::registry::HookRegistry;

/// A handler level in the precedence chain, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Game-specific hook taking engine sessions.
    Specific,
    /// Universal hook taking universal players or identity fields.
    Universal,
    /// Expiring alias of the universal hook.
    Deprecated,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Specific => "specific",
            Self::Universal => "universal",
            Self::Deprecated => "deprecated",
        })
    }
}

/// One canonical event ready to be announced to its tiers.
#[derive(Debug)]
pub struct HookInvocation<'a> {
    event: &'static str,
    specific: Option<HookCall>,
    universal: Option<HookCall>,
    deprecated: Option<&'a DeprecationShim>,
}

impl<'a> HookInvocation<'a> {
    /// Starts an invocation for the canonical event `event`.
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            specific: None,
            universal: None,
            deprecated: None,
        }
    }

    /// Sets the specific-tier call.
    pub fn specific(mut self, call: HookCall) -> Self {
        self.specific = Some(call);
        self
    }

    /// Sets the universal-tier call.
    pub fn universal(mut self, call: HookCall) -> Self {
        self.universal = Some(call);
        self
    }

    /// Adds the deprecated tier. It reuses the universal call's arguments.
    pub fn deprecated(mut self, shim: &'a DeprecationShim) -> Self {
        self.deprecated = Some(shim);
        self
    }

    /// The canonical event name.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// The tiers that will run, in order.
    pub fn tiers(&self) -> Vec<Tier> {
        let mut tiers = Vec::with_capacity(3);
        if self.specific.is_some() {
            tiers.push(Tier::Specific);
        }
        if self.universal.is_some() {
            tiers.push(Tier::Universal);
            if self.deprecated.is_some() {
                tiers.push(Tier::Deprecated);
            }
        }
        tiers
    }

    /// Expiry of the deprecated tier, if present.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.deprecated.map(DeprecationShim::expiry)
    }

    /// Runs every tier in priority order.
    pub async fn invoke(self, registry: &HookRegistry, now: DateTime<Utc>) -> TierResults {
        let span = debug_span!("hook", event = self.event);
        async move {
            let mut results = TierResults::default();

            if let Some(call) = &self.specific {
                results.specific = registry.call(call.clone()).await;
            }
            if let Some(call) = &self.universal {
                results.universal = registry.call(call.clone()).await;
                if let Some(shim) = self.deprecated {
                    results.deprecated = shim.invoke(now, registry, call).await;
                }
            }

            debug!(
                specific = %results.specific,
                universal = %results.universal,
                deprecated = %results.deprecated,
                "Tiers invoked"
            );
            results
        }
        .instrument(span)
        .await
    }
}

/// Per-tier results of one [`HookInvocation`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierResults {
    /// Specific tier.
    pub specific: HookResult,
    /// Universal tier.
    pub universal: HookResult,
    /// Deprecated tier.
    pub deprecated: HookResult,
}

impl TierResults {
    /// The result of one tier.
    pub fn get(&self, tier: Tier) -> &HookResult {
        match tier {
            Tier::Specific => &self.specific,
            Tier::Universal => &self.universal,
            Tier::Deprecated => &self.deprecated,
        }
    }

    /// First opinion in tier order.
    pub fn merged(&self) -> HookResult {
        HookResult::first_of([
            self.specific.clone(),
            self.universal.clone(),
            self.deprecated.clone(),
        ])
    }

    /// Whether any tier had an opinion.
    pub fn any_opinion(&self) -> bool {
        self.specific.has_opinion() || self.universal.has_opinion() || self.deprecated.has_opinion()
    }

    /// The tier whose result wins the merge.
    pub fn deciding_tier(&self) -> Option<Tier> {
        [Tier::Specific, Tier::Universal, Tier::Deprecated]
            .into_iter()
            .find(|tier| self.get(*tier).has_opinion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::legacy_alias_sunset;
    use chrono::Duration;

    fn registry() -> HookRegistry {
        let registry = HookRegistry::new();
        registry.subscribe("game", "Specific", |_call: HookCall| async { Some("Banned") });
        registry.subscribe("universal", "Universal", |_call: HookCall| async { true });
        registry.subscribe("old", "Alias", |_call: HookCall| async { false });
        registry
    }

    fn shim() -> DeprecationShim {
        DeprecationShim::new("Alias", "Universal", legacy_alias_sunset()).with_warnings(false)
    }

    #[tokio::test]
    async fn test_specific_wins_but_all_run() {
        let registry = registry();
        let shim = shim();
        let before = legacy_alias_sunset() - Duration::days(1);

        let results = HookInvocation::new("test")
            .specific(HookCall::new("Specific", Vec::new()))
            .universal(HookCall::new("Universal", Vec::new()))
            .deprecated(&shim)
            .invoke(&registry, before)
            .await;

        assert_eq!(results.merged(), HookResult::reject("Banned"));
        assert_eq!(results.universal, HookResult::approve());
        assert_eq!(results.deprecated, HookResult::deny());
        assert_eq!(results.deciding_tier(), Some(Tier::Specific));
    }

    #[tokio::test]
    async fn test_falls_through_to_deprecated() {
        let registry = registry();
        let shim = shim();
        let before = legacy_alias_sunset() - Duration::days(1);

        let results = HookInvocation::new("test")
            .specific(HookCall::new("Nobody", Vec::new()))
            .universal(HookCall::new("AlsoNobody", Vec::new()))
            .deprecated(&shim)
            .invoke(&registry, before)
            .await;

        assert_eq!(results.merged(), HookResult::deny());
        assert_eq!(results.deciding_tier(), Some(Tier::Deprecated));
    }

    #[tokio::test]
    async fn test_expired_alias_is_skipped() {
        let registry = registry();
        let shim = shim();

        let results = HookInvocation::new("test")
            .universal(HookCall::new("AlsoNobody", Vec::new()))
            .deprecated(&shim)
            .invoke(&registry, legacy_alias_sunset())
            .await;

        assert!(!results.any_opinion());
        assert_eq!(results.merged(), HookResult::NoOpinion);
    }

    #[test]
    fn test_tier_listing() {
        let shim = shim();
        let invocation = HookInvocation::new("connect")
            .universal(HookCall::new("Universal", Vec::new()))
            .deprecated(&shim);
        assert_eq!(invocation.tiers(), vec![Tier::Universal, Tier::Deprecated]);
        assert_eq!(invocation.expiry(), Some(legacy_alias_sunset()));
    }
}
