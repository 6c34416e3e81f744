//! # Tether Adapter for Hurtworld
//!
//! Engine adapters for the two Hurtworld API generations.
//!
//! ## Overview
//!
//! Each generation gets a pair of types:
//!
//! - an [`EventSource`](tether_core::EventSource) that translates the
//!   generation's native callbacks into canonical events
//!   ([`LegacyAdapter`], [`ItemV2Adapter`])
//! - an [`Engine`](tether_core::Engine) that turns bridge requests back into
//!   host calls ([`LegacyEngine`], [`ItemV2Engine`])
//!
//! The host itself (the game's managers) is reached through the
//! [`HurtworldHost`] traits and injected by the embedding code. Disconnects
//! are never applied inside a callback; they wait for the engine's next
//! `tick()`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_adapter_hurtworld::{LegacyAdapter, LegacyEngine, LegacyCallback};
//! use tether_runtime::BridgeRuntime;
//!
//! let engine = Arc::new(LegacyEngine::new(host));
//! let runtime = BridgeRuntime::builder().build(engine.clone())?;
//! let handle = runtime.handle();
//!
//! // From an engine callback thread:
//! let value = handle.blocking_submit_native(&LegacyAdapter::new(), callback)?;
//!
//! // From the engine's update loop:
//! engine.tick();
//! ```
//!
//! ## Branch Differences
//!
//! ```text
//! callback          public                   itemv2
//! ────────────────  ───────────────────────  ──────────────────────────
//! chat / command    separate callbacks       one callback, split on prefix
//! entity effects    stat name ("Health")     FluidEffect::Health
//! doors             one callback per kind    one callback with DoorKind
//! disconnect        no reason                reason string
//! broadcast         RelayChat RPC            server chat message
//! ```

pub mod host;
pub mod itemv2;
pub mod legacy;
pub mod native;
pub mod provider;

pub use host::{DeferredAction, DeferredActions, HurtworldHost};
pub use itemv2::{FluidEffect, ItemV2Adapter, ItemV2Callback, ItemV2Engine, ItemV2Host};
pub use legacy::{LegacyAdapter, LegacyCallback, LegacyEngine, LegacyHost};
pub use native::{GameplayCallback, NativePlayer, NativeTarget};
pub use provider::{
    BRANCH_ITEMV2, BRANCH_PUBLIC, CLIENT_APP_ID, GAME_NAME, ProviderInfo, SERVER_APP_ID,
};
