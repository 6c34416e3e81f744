//! The `public` API branch.
//!
//! The legacy engine reports stat changes by name, has one callback per door
//! variant, hands chat and commands over separately, and gives no reason on
//! disconnect. Broadcasts go out as a `RelayChat` RPC to every client.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use tether_core::{
    ConnectionHandle, DoorKind, Engine, EngineEvent, EventSource, GameplayEvent,
    format_broadcast,
};

use crate::host::{EngineCore, HurtworldHost};
use crate::native::{GameplayCallback, NativePlayer, NativeTarget};
use crate::provider::BRANCH_PUBLIC;

/// RPC used for chat broadcasts.
pub const RELAY_CHAT_RPC: &str = "RelayChat";

/// Stat name of the health effect.
pub const HEALTH_STAT: &str = "Health";

/// A callback from the legacy engine.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyCallback {
    /// `IOnUserApprove`.
    Approve(NativePlayer),
    /// `IOnPlayerConnected`.
    Connected {
        /// Connection.
        player: u64,
    },
    /// `IOnPlayerDisconnected`.
    Disconnected {
        /// Connection.
        player: u64,
    },
    /// `IOnPlayerChat`.
    Chat {
        /// Sender.
        player: u64,
        /// Text.
        message: String,
    },
    /// `IOnPlayerCommand`.
    Command {
        /// Sender.
        player: u64,
        /// Raw command line.
        command: String,
    },
    /// `IOnEntityStats`.
    EntityStats {
        /// Affected entity.
        target: NativeTarget,
        /// Stat name.
        stat: String,
        /// Signed amount.
        amount: f64,
        /// Effect source.
        source: Value,
    },
    /// `IOnSingleDoorUsed`.
    SingleDoorUsed {
        /// Door.
        door: Value,
        /// Last user.
        last_user: Option<u64>,
    },
    /// `IOnDoubleDoorUsed`.
    DoubleDoorUsed {
        /// Door.
        door: Value,
        /// Last user.
        last_user: Option<u64>,
    },
    /// `IOnGarageDoorUsed`.
    GarageDoorUsed {
        /// Door.
        door: Value,
        /// Last user.
        last_user: Option<u64>,
    },
    /// Callbacks shared with the itemv2 branch.
    Gameplay(GameplayCallback),
}

/// Translates legacy callbacks into canonical events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyAdapter;

impl LegacyAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }
}

fn door(kind: DoorKind, door: Value, last_user: Option<u64>) -> EngineEvent {
    EngineEvent::Gameplay(GameplayEvent::DoorUsed {
        kind,
        door,
        last_user: last_user.map(ConnectionHandle),
    })
}

impl EventSource for LegacyAdapter {
    type Native = LegacyCallback;

    fn branch(&self) -> &'static str {
        BRANCH_PUBLIC
    }

    fn translate(&self, native: LegacyCallback) -> Option<EngineEvent> {
        let event = match native {
            LegacyCallback::Approve(player) => EngineEvent::Approve(player.into_session()),
            LegacyCallback::Connected { player } => EngineEvent::Connected {
                handle: ConnectionHandle(player),
            },
            LegacyCallback::Disconnected { player } => EngineEvent::Disconnected {
                handle: ConnectionHandle(player),
                reason: None,
            },
            LegacyCallback::Chat { player, message } => EngineEvent::Chat {
                handle: ConnectionHandle(player),
                message,
            },
            LegacyCallback::Command { player, command } => EngineEvent::Command {
                handle: ConnectionHandle(player),
                line: command,
            },
            LegacyCallback::EntityStats {
                target,
                stat,
                amount,
                source,
            } => EngineEvent::Gameplay(GameplayEvent::EntityEffect {
                target: target.into(),
                health: stat == HEALTH_STAT,
                amount,
                source,
            }),
            LegacyCallback::SingleDoorUsed { door: d, last_user } => {
                door(DoorKind::Single, d, last_user)
            }
            LegacyCallback::DoubleDoorUsed { door: d, last_user } => {
                door(DoorKind::Double, d, last_user)
            }
            LegacyCallback::GarageDoorUsed { door: d, last_user } => {
                door(DoorKind::Garage, d, last_user)
            }
            LegacyCallback::Gameplay(callback) => EngineEvent::Gameplay(callback.into()),
        };
        trace!(kind = event.kind(), "Translated legacy callback");
        Some(event)
    }
}

/// Host operations only the legacy engine has.
pub trait LegacyHost: HurtworldHost {
    /// Invokes `method` on every connected client.
    fn rpc_others(&self, method: &str, payload: &str) -> anyhow::Result<()>;
}

impl<T: LegacyHost + ?Sized> LegacyHost for Arc<T> {
    fn rpc_others(&self, method: &str, payload: &str) -> anyhow::Result<()> {
        (**self).rpc_others(method, payload)
    }
}

/// [`Engine`] for the legacy branch.
pub struct LegacyEngine<H> {
    core: EngineCore<H>,
}

impl<H: LegacyHost> LegacyEngine<H> {
    /// Wraps `host`.
    pub fn new(host: H) -> Self {
        Self {
            core: EngineCore::new(host),
        }
    }

    /// The wrapped host.
    pub fn host(&self) -> &H {
        &self.core.host
    }

    /// Sends `message` to one player with an optional prefix.
    pub fn message(&self, handle: ConnectionHandle, prefix: Option<&str>, message: &str) {
        self.core.message(handle, prefix, message);
    }

    /// Applies deferred actions. Call once per engine tick.
    pub fn tick(&self) -> usize {
        self.core.tick()
    }

    /// Deferred actions waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.core.deferred.len()
    }
}

impl<H: LegacyHost> Engine for LegacyEngine<H> {
    fn branch(&self) -> &str {
        BRANCH_PUBLIC
    }

    fn schedule_disconnect(&self, handle: ConnectionHandle, reason: &str) {
        self.core.schedule_disconnect(handle, reason);
    }

    fn send_message(&self, handle: ConnectionHandle, message: &str) {
        self.core.message(handle, None, message);
    }

    fn broadcast(&self, prefix: Option<&str>, message: &str) {
        let formatted = format_broadcast(prefix, message);
        self.core.broadcast_with(message, &formatted, |host, line| {
            host.rpc_others(RELAY_CHAT_RPC, line)
        });
    }
}
