//! Hook subscriptions.
//!
//! The [`HookRegistry`] maps hook names to the plugins subscribed to them.
//! Calling a hook runs every subscriber in registration order and returns the
//! first result that carries an opinion.
//!
//! # Conflicts
//!
//! When two subscribers return different opinions, the first still wins, but
//! the disagreement is logged so operators can see which plugins are fighting
//! over the same hook.
//!
//! # Faults
//!
//! A subscriber that errors or panics is logged and counted as having no
//! opinion. The remaining subscribers still run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{trace, warn};

use tether_core::{HookCall, HookResult, IntoHookResult};

use crate::handler::{BoxedHookHandler, HookHandler, invoke_isolated};

#[derive(Clone)]
struct Subscription {
    plugin: Arc<str>,
    handler: BoxedHookHandler,
}

/// Registry of hook subscribers, keyed by hook name.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a closure to `hook` on behalf of `plugin`.
    pub fn subscribe<F, Fut, R>(&self, plugin: &str, hook: &str, handler: F)
    where
        F: Fn(HookCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHookResult + Send + 'static,
    {
        self.subscribe_handler(plugin, hook, Arc::new(handler));
    }

    /// Subscribes a [`HookHandler`] value, such as a plugin struct.
    pub fn subscribe_with<H: HookHandler>(&self, plugin: &str, hook: &str, handler: H) {
        self.subscribe_handler(plugin, hook, Arc::new(handler));
    }

    /// Subscribes an already boxed handler.
    pub fn subscribe_handler(&self, plugin: &str, hook: &str, handler: BoxedHookHandler) {
        trace!(plugin = %plugin, hook = %hook, "Hook subscribed");
        self.hooks
            .write()
            .entry(hook.to_string())
            .or_default()
            .push(Subscription {
                plugin: Arc::from(plugin),
                handler,
            });
    }

    /// Removes every subscription held by `plugin`. Returns how many were removed.
    pub fn unsubscribe_plugin(&self, plugin: &str) -> usize {
        let mut hooks = self.hooks.write();
        let mut removed = 0;
        hooks.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|s| &*s.plugin != plugin);
            removed += before - subs.len();
            !subs.is_empty()
        });
        removed
    }

    /// Whether anything is subscribed to `hook`.
    pub fn has_subscribers(&self, hook: &str) -> bool {
        self.hooks.read().contains_key(hook)
    }

    /// Plugins subscribed to `hook`, in registration order, without repeats.
    pub fn plugins_for(&self, hook: &str) -> Vec<String> {
        let hooks = self.hooks.read();
        let mut plugins: Vec<String> = Vec::new();
        for sub in hooks.get(hook).into_iter().flatten() {
            if !plugins.iter().any(|p| **p == *sub.plugin) {
                plugins.push(sub.plugin.to_string());
            }
        }
        plugins
    }

    /// Total number of subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.hooks.read().values().map(Vec::len).sum()
    }

    /// Calls every subscriber of `call.name()` and returns the first opinion.
    pub async fn call(&self, call: HookCall) -> HookResult {
        // Snapshot so no lock is held while subscribers run.
        let subscribers = match self.hooks.read().get(call.name()) {
            Some(subs) => subs.clone(),
            None => return HookResult::NoOpinion,
        };

        let mut winner: Option<(Arc<str>, HookResult)> = None;
        for sub in subscribers {
            let result = match invoke_isolated(&*sub.handler, call.clone()).await {
                Ok(result) => result,
                Err(fault) => {
                    warn!(
                        plugin = %sub.plugin,
                        hook = %call.name(),
                        error = %fault,
                        "Hook handler fault, treating as no opinion"
                    );
                    continue;
                }
            };

            if !result.has_opinion() {
                continue;
            }

            match &winner {
                None => winner = Some((Arc::clone(&sub.plugin), result)),
                Some((first_plugin, first)) if *first != result => {
                    warn!(
                        hook = %call.name(),
                        plugin = %sub.plugin,
                        result = %result,
                        winner = %first_plugin,
                        winning_result = %first,
                        "Calling hook resulted in a conflict"
                    );
                }
                Some(_) => {}
            }
        }

        winner.map(|(_, result)| result).unwrap_or_default()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.read().len())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
