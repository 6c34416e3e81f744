//! Canonical engine events and the event-source boundary.
//!
//! Engine adapters receive callbacks in whatever shape their API generation
//! uses and translate them into [`EngineEvent`]s. Everything downstream of the
//! adapter (directory, dispatcher, command routing) only ever sees canonical
//! events.
//!
//! Engine-native objects the bridge does not interpret (recipes, clans,
//! vehicles, doors, input snapshots, effect sources) travel as
//! [`serde_json::Value`] and are handed to subscribers untouched.

use serde_json::Value;

use crate::identity::ConnectionHandle;
use crate::session::Session;

// =============================================================================
// EngineEvent
// =============================================================================

/// A canonical engine notification.
#[derive(Debug)]
pub enum EngineEvent {
    /// A connection is asking to be approved.
    Approve(Session),
    /// Post-approval setup should run for a connection.
    Connected {
        /// Connection that finished loading.
        handle: ConnectionHandle,
    },
    /// A connection went away.
    Disconnected {
        /// Connection that left.
        handle: ConnectionHandle,
        /// Reason reported by the engine, if any.
        reason: Option<String>,
    },
    /// A plain chat message.
    Chat {
        /// Sender.
        handle: ConnectionHandle,
        /// Message text.
        message: String,
    },
    /// A chat line the engine recognised as a command.
    Command {
        /// Sender.
        handle: ConnectionHandle,
        /// Raw line, prefix included if the player typed one.
        line: String,
    },
    /// A gameplay notification.
    Gameplay(GameplayEvent),
}

impl EngineEvent {
    /// The connection this event concerns, if any.
    pub fn handle(&self) -> Option<ConnectionHandle> {
        match self {
            Self::Approve(session) => Some(session.handle()),
            Self::Connected { handle }
            | Self::Disconnected { handle, .. }
            | Self::Chat { handle, .. }
            | Self::Command { handle, .. } => Some(*handle),
            Self::Gameplay(event) => event.handle(),
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approve(_) => "approve",
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Chat { .. } => "chat",
            Self::Command { .. } => "command",
            Self::Gameplay(event) => event.kind(),
        }
    }
}

// =============================================================================
// GameplayEvent
// =============================================================================

/// Door variants with their own hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorKind {
    /// Single-leaf door.
    Single,
    /// Double door.
    Double,
    /// Garage door.
    Garage,
}

/// What an entity effect was applied to.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectTarget {
    /// An AI-controlled creature.
    Creature(Value),
    /// An entity owned by a player connection.
    Player(ConnectionHandle),
    /// Anything else; ignored.
    Other,
}

/// Gameplay notifications routed to the specific tier only.
#[derive(Debug, Clone, PartialEq)]
pub enum GameplayEvent {
    /// A player is attempting to craft.
    Craft {
        /// Crafting player.
        handle: ConnectionHandle,
        /// Recipe being crafted.
        recipe: Value,
    },
    /// A player is attempting to claim territory.
    ClaimTerritory {
        /// Claiming player.
        handle: ConnectionHandle,
        /// Clan the claim is for.
        clan: Value,
        /// Territory control point.
        point: i64,
    },
    /// A player claimed territory.
    ClaimedTerritory {
        /// Claiming player.
        handle: ConnectionHandle,
        /// Clan the claim is for.
        clan: Value,
        /// Territory control point.
        point: i64,
    },
    /// A player sent input.
    Input {
        /// Player.
        handle: ConnectionHandle,
        /// Input snapshot.
        input: Value,
    },
    /// A player is attempting suicide.
    Suicide {
        /// Player.
        handle: ConnectionHandle,
    },
    /// A player is using voice chat.
    Voice {
        /// Player.
        handle: ConnectionHandle,
    },
    /// A stat effect was applied to an entity.
    EntityEffect {
        /// Affected entity.
        target: EffectTarget,
        /// Whether the effect targets health; other stats are ignored.
        health: bool,
        /// Signed amount. Non-negative is damage, negative is healing.
        amount: f64,
        /// Effect source.
        source: Value,
    },
    /// A door was used.
    DoorUsed {
        /// Door variant.
        kind: DoorKind,
        /// The door.
        door: Value,
        /// Last user, if the engine knows it.
        last_user: Option<ConnectionHandle>,
    },
    /// A player is attempting to enter a vehicle.
    CanEnterVehicle {
        /// Player.
        handle: ConnectionHandle,
        /// Vehicle.
        vehicle: Value,
    },
    /// A player is attempting to exit a vehicle.
    CanExitVehicle {
        /// Player.
        handle: ConnectionHandle,
        /// Vehicle.
        vehicle: Value,
    },
    /// A player entered a vehicle.
    EnteredVehicle {
        /// Player.
        handle: ConnectionHandle,
        /// Vehicle.
        vehicle: Value,
    },
    /// A player exited a vehicle.
    ExitedVehicle {
        /// Player.
        handle: ConnectionHandle,
        /// Vehicle.
        vehicle: Value,
    },
}

impl GameplayEvent {
    /// The player connection this event concerns, if any.
    pub fn handle(&self) -> Option<ConnectionHandle> {
        match self {
            Self::Craft { handle, .. }
            | Self::ClaimTerritory { handle, .. }
            | Self::ClaimedTerritory { handle, .. }
            | Self::Input { handle, .. }
            | Self::Suicide { handle }
            | Self::Voice { handle }
            | Self::CanEnterVehicle { handle, .. }
            | Self::CanExitVehicle { handle, .. }
            | Self::EnteredVehicle { handle, .. }
            | Self::ExitedVehicle { handle, .. } => Some(*handle),
            Self::EntityEffect { target, .. } => match target {
                EffectTarget::Player(handle) => Some(*handle),
                _ => None,
            },
            Self::DoorUsed { last_user, .. } => *last_user,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Craft { .. } => "craft",
            Self::ClaimTerritory { .. } => "claim_territory",
            Self::ClaimedTerritory { .. } => "claimed_territory",
            Self::Input { .. } => "input",
            Self::Suicide { .. } => "suicide",
            Self::Voice { .. } => "voice",
            Self::EntityEffect { .. } => "entity_effect",
            Self::DoorUsed { .. } => "door_used",
            Self::CanEnterVehicle { .. } => "can_enter_vehicle",
            Self::CanExitVehicle { .. } => "can_exit_vehicle",
            Self::EnteredVehicle { .. } => "entered_vehicle",
            Self::ExitedVehicle { .. } => "exited_vehicle",
        }
    }
}

// =============================================================================
// EventSource
// =============================================================================

/// An engine API generation that produces canonical events.
///
/// Each generation has its own native callback type; implementations map it
/// onto [`EngineEvent`]. Callbacks the bridge does not care about translate
/// to `None`.
pub trait EventSource: Send + Sync {
    /// The generation's native callback type.
    type Native;

    /// Branch name of the API generation.
    fn branch(&self) -> &'static str;

    /// Translates one native callback.
    fn translate(&self, native: Self::Native) -> Option<EngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PlayerId;
    use serde_json::json;

    #[test]
    fn test_event_handle() {
        let approve = EngineEvent::Approve(
            Session::builder(ConnectionHandle(4), PlayerId(1)).build(),
        );
        assert_eq!(approve.handle(), Some(ConnectionHandle(4)));
        assert_eq!(approve.kind(), "approve");

        let creature = EngineEvent::Gameplay(GameplayEvent::EntityEffect {
            target: EffectTarget::Creature(json!({"kind": "wolf"})),
            health: true,
            amount: 10.0,
            source: Value::Null,
        });
        assert_eq!(creature.handle(), None);
        assert_eq!(creature.kind(), "entity_effect");
    }

    #[test]
    fn test_door_without_user_has_no_handle() {
        let door = GameplayEvent::DoorUsed {
            kind: DoorKind::Garage,
            door: json!({}),
            last_user: None,
        };
        assert_eq!(door.handle(), None);
    }
}
