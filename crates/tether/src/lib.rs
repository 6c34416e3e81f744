//! # Tether
//!
//! A hook bridge between a game server engine and plugin code.
//!
//! ## Overview
//!
//! Tether receives engine callbacks (player approval, connect, disconnect,
//! chat, commands and gameplay notifications), keeps track of live player
//! sessions and fans every event out to subscribed plugin handlers in three
//! tiers: engine-specific hooks, engine-agnostic universal hooks and
//! deprecated aliases with a sunset date.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  native   ┌─────────┐  EngineEvent  ┌──────────────┐
//! │ Engine host  │──────────▶│ Adapter │──────────────▶│   Runtime    │
//! │ (callbacks)  │◀──────────│         │◀──────────────│ (event loop) │
//! └──────────────┘   value   └─────────┘ EventResponse └──────┬───────┘
//!        ▲                                                    │
//!        │ deferred disconnect, chat                          ▼
//! ┌──────┴───────┐                                   ┌────────────────┐
//! │    Engine    │◀──────────────────────────────────│ HookDispatcher │──▶ plugins
//! └──────────────┘                                   └────────────────┘
//! ```
//!
//! - **Core**: sessions, identities, hook values and the engine boundary
//! - **Framework**: hook registry, tiered dispatch, command routing
//! - **Runtime**: configuration, logging and the sequential event loop
//! - **Adapters**: per-generation translation of native callbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(LegacyEngine::new(host));
//!     let runtime = BridgeRuntime::builder().build(engine.clone())?;
//!
//!     runtime
//!         .dispatcher()
//!         .registry()
//!         .subscribe("bans", hooks::CAN_CLIENT_LOGIN, |call: HookCall| async move {
//!             match call.session() {
//!                 Some(s) if s.id() == PlayerId(76561198000000000) => Some("Banned"),
//!                 _ => None,
//!             }
//!         });
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `hurtworld`: Hurtworld engine adapters (default)
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use tether_core as core;
pub use tether_framework as framework;
pub use tether_runtime as runtime;

#[cfg(feature = "hurtworld")]
pub use tether_adapter_hurtworld as hurtworld;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tether::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tether_runtime::{BridgeRuntime, RuntimeHandle, TetherConfig};

    // Hook system
    pub use tether_core::{HookArg, HookCall, HookResult, IntoHookResult};
    pub use tether_framework::{EventResponse, HookDispatcher, HookRegistry, hooks};

    // Commands
    pub use tether_framework::{CommandCall, CommandRouter, TableKind};

    // Identity and sessions
    pub use tether_core::{ConnectionHandle, PlayerId, Session, UniversalPlayer};

    // Engine boundary
    pub use tether_core::{Engine, EngineEvent, EventSource};

    #[cfg(feature = "hurtworld")]
    pub use tether_adapter_hurtworld::{
        ItemV2Adapter, ItemV2Engine, LegacyAdapter, LegacyEngine,
    };
}
