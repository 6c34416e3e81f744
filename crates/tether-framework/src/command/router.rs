//! Command routing.
//!
//! Routing order for a parsed line:
//!
//! 1. Restricted names are rejected outright.
//! 2. The universal table gets the first chance to claim the command.
//! 3. The legacy chat table is tried next.
//!
//! A table that claims a command counts as having handled it even if its
//! handler fails.

use std::sync::Arc;

use tracing::{debug, info};

use tether_core::Session;

use super::table::{CommandCall, CommandTable};
use super::{CommandInvocation, CommandParser, CommandSettings};

/// Names reserved for server configuration: bind address, host, query port.
pub const RESTRICTED_COMMANDS: [&str; 3] = ["bindip", "host", "queryport"];

/// Whether `name` is restricted (case-insensitive).
pub fn is_restricted(name: &str) -> bool {
    RESTRICTED_COMMANDS
        .iter()
        .any(|restricted| restricted.eq_ignore_ascii_case(name))
}

/// Which table handled a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The universal command table.
    Universal,
    /// The legacy chat command table.
    Legacy,
}

/// Result of routing a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The line is not a command.
    NotCommand,
    /// The command is restricted and was not routed.
    Restricted(CommandInvocation),
    /// No table claims the command.
    Unhandled(CommandInvocation),
    /// A table claimed the command.
    Handled {
        /// The claiming table.
        table: TableKind,
        /// The routed command.
        invocation: CommandInvocation,
    },
}

impl RouteOutcome {
    /// Whether a table claimed the command.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    /// The parsed command, if the line was one.
    pub fn invocation(&self) -> Option<&CommandInvocation> {
        match self {
            Self::NotCommand => None,
            Self::Restricted(invocation)
            | Self::Unhandled(invocation)
            | Self::Handled { invocation, .. } => Some(invocation),
        }
    }
}

/// Parses chat lines and routes them to the command tables.
#[derive(Debug)]
pub struct CommandRouter {
    parser: CommandParser,
    universal: CommandTable,
    legacy: CommandTable,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(CommandSettings::default())
    }
}

impl CommandRouter {
    /// Creates a router with empty tables.
    pub fn new(settings: CommandSettings) -> Self {
        Self {
            parser: CommandParser::new(settings),
            universal: CommandTable::universal(),
            legacy: CommandTable::legacy(),
        }
    }

    /// The line parser.
    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// The universal command table.
    pub fn universal(&self) -> &CommandTable {
        &self.universal
    }

    /// The legacy chat command table.
    pub fn legacy(&self) -> &CommandTable {
        &self.legacy
    }

    /// Removes every command `plugin` owns in either table.
    pub fn unregister_plugin(&self, plugin: &str) -> usize {
        self.universal.unregister_plugin(plugin) + self.legacy.unregister_plugin(plugin)
    }

    /// Parses and routes `raw_line` on behalf of `actor`.
    pub async fn route(&self, raw_line: &str, actor: &Arc<Session>) -> RouteOutcome {
        match self.parser.parse(raw_line) {
            Some(invocation) => self.route_invocation(invocation, actor).await,
            None => RouteOutcome::NotCommand,
        }
    }

    /// Routes an already parsed command.
    pub async fn route_invocation(
        &self,
        invocation: CommandInvocation,
        actor: &Arc<Session>,
    ) -> RouteOutcome {
        if is_restricted(invocation.name()) {
            info!(
                player_id = %actor.id(),
                command = %invocation.name(),
                "Restricted command rejected"
            );
            return RouteOutcome::Restricted(invocation);
        }

        for (kind, table) in [
            (TableKind::Universal, &self.universal),
            (TableKind::Legacy, &self.legacy),
        ] {
            let call = CommandCall::new(Arc::clone(actor), invocation.clone());
            if table.handle(call).await.is_some() {
                debug!(command = %invocation.name(), table = ?kind, "Command handled");
                return RouteOutcome::Handled {
                    table: kind,
                    invocation,
                };
            }
        }

        debug!(command = %invocation.name(), "Command not claimed by any table");
        RouteOutcome::Unhandled(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tether_core::{ConnectionHandle, PlayerId};

    fn actor() -> Arc<Session> {
        Arc::new(Session::builder(ConnectionHandle(1), PlayerId(1)).build())
    }

    #[tokio::test]
    async fn test_routes_universal_before_legacy() {
        let router = CommandRouter::default();
        let legacy_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&legacy_calls);

        router
            .universal()
            .register("u", "home", |_call: CommandCall| async {})
            .unwrap();
        router
            .legacy()
            .register("l", "home", move |_call: CommandCall| {
                counter.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .unwrap();

        let outcome = router.route("/home", &actor()).await;
        assert!(outcome.is_handled());
        assert!(matches!(
            outcome,
            RouteOutcome::Handled {
                table: TableKind::Universal,
                ..
            }
        ));
        assert_eq!(legacy_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy() {
        let router = CommandRouter::default();
        router
            .legacy()
            .register("l", "sethome", |_call: CommandCall| async {})
            .unwrap();

        let outcome = router.route("/sethome base", &actor()).await;
        assert!(matches!(
            outcome,
            RouteOutcome::Handled {
                table: TableKind::Legacy,
                ..
            }
        ));
        assert_eq!(outcome.invocation().unwrap().args(), ["base"]);
    }

    #[tokio::test]
    async fn test_unclaimed_and_empty() {
        let router = CommandRouter::default();
        let outcome = router.route("/nothing here", &actor()).await;
        assert!(!outcome.is_handled());
        assert_eq!(outcome.invocation().unwrap().name(), "nothing");

        assert_eq!(router.route("/", &actor()).await, RouteOutcome::NotCommand);
    }

    #[tokio::test]
    async fn test_restricted_wins_over_handlers() {
        let router = CommandRouter::default();
        assert!(
            router
                .universal()
                .register("evil", "host", |_call: CommandCall| async { true })
                .is_err()
        );

        for line in ["/bindip 0.0.0.0", "/HOST", "/QueryPort 27016"] {
            let outcome = router.route(line, &actor()).await;
            assert!(matches!(outcome, RouteOutcome::Restricted(_)));
            assert!(!outcome.is_handled());
        }
    }

    #[tokio::test]
    async fn test_failing_handler_still_handled() {
        let router = CommandRouter::default();
        router
            .universal()
            .register("p", "kit", |_call: CommandCall| async {
                Err::<(), _>("unknown kit")
            })
            .unwrap();

        assert!(router.route("/kit nope", &actor()).await.is_handled());
    }
}
