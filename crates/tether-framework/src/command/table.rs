//! Command tables.
//!
//! A [`CommandTable`] maps command names to the plugin handler that owns
//! them. The universal table matches names case-insensitively; the legacy
//! chat table matches the name exactly as typed.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, warn};

use tether_core::{HandlerFault, HookResult, IntoHookResult, Session, UniversalPlayer};

use super::CommandInvocation;
use super::router::is_restricted;
use crate::error::{CommandError, CommandResult};

// ============================================================================
// CommandCall
// ============================================================================

/// What a command handler receives.
#[derive(Debug, Clone)]
pub struct CommandCall {
    session: Arc<Session>,
    invocation: CommandInvocation,
}

impl CommandCall {
    /// Creates a call.
    pub fn new(session: Arc<Session>, invocation: CommandInvocation) -> Self {
        Self {
            session,
            invocation,
        }
    }

    /// The invoking session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The invoking universal player, once bound.
    pub fn player(&self) -> Option<&Arc<UniversalPlayer>> {
        self.session.player()
    }

    /// The parsed command.
    pub fn invocation(&self) -> &CommandInvocation {
        &self.invocation
    }

    /// Shorthand for the command's arguments.
    pub fn args(&self) -> &[String] {
        self.invocation.args()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// A type-erased command handler.
pub type BoxedCommandHandler =
    Arc<dyn Fn(CommandCall) -> BoxFuture<'static, Result<HookResult, String>> + Send + Sync>;

/// Converts an async function into a [`BoxedCommandHandler`].
pub fn into_command_handler<F, Fut, R>(f: F) -> BoxedCommandHandler
where
    F: Fn(CommandCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHookResult + Send + 'static,
{
    Arc::new(move |call| {
        let fut = f(call);
        Box::pin(async move { fut.await.into_hook_result() })
    })
}

// ============================================================================
// CommandTable
// ============================================================================

struct Entry {
    plugin: String,
    handler: BoxedCommandHandler,
}

/// Name-to-handler table for one command system.
pub struct CommandTable {
    label: &'static str,
    case_sensitive: bool,
    commands: RwLock<HashMap<String, Entry>>,
}

impl CommandTable {
    /// The universal table: names match case-insensitively.
    pub fn universal() -> Self {
        Self::new("universal", false)
    }

    /// The legacy chat table: names match exactly.
    pub fn legacy() -> Self {
        Self::new("legacy", true)
    }

    fn new(label: &'static str, case_sensitive: bool) -> Self {
        Self {
            label,
            case_sensitive,
            commands: RwLock::new(HashMap::new()),
        }
    }

    /// Whether names are matched exactly.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    fn lookup_key<'a>(&self, invocation: &'a CommandInvocation) -> &'a str {
        if self.case_sensitive {
            invocation.raw_name()
        } else {
            invocation.name()
        }
    }

    /// Registers `name` for `plugin`.
    ///
    /// A plugin may re-register its own command, replacing the handler.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty, restricted, or owned by another plugin.
    pub fn register<F, Fut, R>(&self, plugin: &str, name: &str, handler: F) -> CommandResult<()>
    where
        F: Fn(CommandCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHookResult + Send + 'static,
    {
        self.register_handler(plugin, name, into_command_handler(handler))
    }

    /// Registers an already boxed handler. See [`CommandTable::register`].
    pub fn register_handler(
        &self,
        plugin: &str,
        name: &str,
        handler: BoxedCommandHandler,
    ) -> CommandResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandError::EmptyName);
        }
        if is_restricted(name) {
            return Err(CommandError::Restricted(name.to_string()));
        }

        let key = self.key(name);
        let mut commands = self.commands.write();
        if let Some(existing) = commands.get(&key)
            && existing.plugin != plugin
        {
            return Err(CommandError::AlreadyRegistered {
                name: name.to_string(),
                owner: existing.plugin.clone(),
            });
        }

        debug!(table = self.label, plugin = %plugin, command = %name, "Command registered");
        commands.insert(
            key,
            Entry {
                plugin: plugin.to_string(),
                handler,
            },
        );
        Ok(())
    }

    /// Removes `name` if `plugin` owns it.
    pub fn unregister(&self, plugin: &str, name: &str) -> bool {
        let key = self.key(name.trim());
        let mut commands = self.commands.write();
        match commands.get(&key) {
            Some(entry) if entry.plugin == plugin => {
                commands.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Removes every command owned by `plugin`.
    pub fn unregister_plugin(&self, plugin: &str) -> usize {
        let mut commands = self.commands.write();
        let before = commands.len();
        commands.retain(|_, entry| entry.plugin != plugin);
        before - commands.len()
    }

    /// Whether this table claims `invocation`.
    pub fn claims(&self, invocation: &CommandInvocation) -> bool {
        self.commands
            .read()
            .contains_key(self.lookup_key(invocation))
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Runs the owning handler.
    ///
    /// Returns `None` if the table has no entry for the command. A handler
    /// fault is logged and reported, but the command still counts as claimed.
    pub async fn handle(&self, call: CommandCall) -> Option<Result<HookResult, HandlerFault>> {
        let (plugin, handler) = {
            let commands = self.commands.read();
            let entry = commands.get(self.lookup_key(call.invocation()))?;
            (entry.plugin.clone(), Arc::clone(&entry.handler))
        };

        let command = call.invocation().name().to_string();
        let outcome = match AssertUnwindSafe(handler(call)).catch_unwind().await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(HandlerFault::Failed(message)),
            Err(payload) => Err(HandlerFault::from_panic(payload.as_ref())),
        };

        if let Err(fault) = &outcome {
            warn!(
                table = self.label,
                plugin = %plugin,
                command = %command,
                error = %fault,
                "Command handler fault"
            );
        }
        Some(outcome)
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("label", &self.label)
            .field("case_sensitive", &self.case_sensitive)
            .field("commands", &self.commands.read().len())
            .finish()
    }
}
