//! # Tether Framework
//!
//! Plugin-facing layer of the Tether game event bridge.
//!
//! This layer provides:
//! - [`HookRegistry`] for named hook subscriptions with fault isolation
//! - Tiered invocation (specific, universal, deprecated) with result merging
//! - Expiring aliases for retired hook names
//! - Chat command parsing and routing across the universal and legacy tables
//! - [`HookDispatcher`], which turns canonical engine events into hook calls
//!
//! Everything here is engine-agnostic; engine adapters feed
//! [`EngineEvent`](tether_core::EngineEvent)s in and act on the
//! [`EventResponse`]s that come back.

pub mod command;
pub mod deprecation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod registry;
pub mod tier;

pub use command::{
    BoxedCommandHandler, CommandCall, CommandInvocation, CommandParser, CommandRouter,
    CommandSettings, CommandTable, RESTRICTED_COMMANDS, RouteOutcome, TableKind,
    into_command_handler, is_restricted,
};
pub use deprecation::{DeprecationShim, LegacyAliases};
pub use dispatcher::{
    ApprovalDecision, CommandOutcome, DispatchSettings, EventResponse, HookDispatcher,
    HookDispatcherBuilder,
};
pub use error::{CommandError, CommandResult};
pub use handler::{BoxedHookHandler, HookHandler, invoke_isolated};
pub use registry::HookRegistry;
pub use tier::{HookInvocation, Tier, TierResults};
