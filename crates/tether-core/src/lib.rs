//! # Tether Core
//!
//! Foundation types of the Tether game event bridge.
//!
//! This crate owns the state the bridge keeps about live players and the
//! value types exchanged with hook subscribers. It has no async code and no
//! knowledge of any particular engine generation.
//!
//! ## Contents
//!
//! - **Identity**: [`ConnectionHandle`], [`PlayerId`] and the
//!   [`IdentityRegistry`] collaborator boundary
//! - **Sessions**: [`Session`] records and the [`SessionDirectory`] that owns
//!   them
//! - **Universal players**: [`UniversalPlayer`] and the [`PlayerManager`]
//! - **Hook values**: [`HookCall`], [`HookArg`] and the typed [`HookResult`]
//! - **Engine boundary**: canonical [`EngineEvent`]s, the [`EventSource`]
//!   adapter trait and the outbound [`Engine`] trait
//! - **Time**: the injectable [`Clock`]
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐   EngineEvent   ┌────────────┐   HookCall   ┌────────────┐
//! │ EventSource │────────────────▶│ Dispatcher │─────────────▶│ Subscriber │
//! │  (adapter)  │                 │            │◀─────────────│            │
//! └─────────────┘                 └────────────┘  HookResult  └────────────┘
//!                                   │      │
//!                        lookups    │      │   disconnect / chat
//!                                   ▼      ▼
//!                     ┌──────────────────┐ ┌────────┐
//!                     │ SessionDirectory │ │ Engine │
//!                     └──────────────────┘ └────────┘
//! ```

pub mod clock;
pub mod directory;
pub mod engine;
pub mod error;
pub mod event;
pub mod hook;
pub mod identity;
pub mod players;
pub mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::SessionDirectory;
pub use engine::{Engine, console_chat_line, format_broadcast, format_direct};
pub use error::{DirectoryError, DirectoryResult, HandlerFault};
pub use event::{DoorKind, EffectTarget, EngineEvent, EventSource, GameplayEvent};
pub use hook::{HookArg, HookCall, HookResult, IntoHookResult};
pub use identity::{
    ConnectionHandle, IdentityRecord, IdentityRegistry, MemoryIdentityRegistry, PlayerId,
};
pub use players::{PlayerManager, UniversalPlayer};
pub use session::{DEFAULT_DISPLAY_NAME, Session, SessionBuilder};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Clock, ConnectionHandle, Engine, EngineEvent, EventSource, GameplayEvent, HookArg,
        HookCall, HookResult, IdentityRegistry, IntoHookResult, PlayerId, Session,
        SessionDirectory, UniversalPlayer,
    };
}
