//! Native callback payloads shared by both API branches.
//!
//! Engine objects the bridge does not interpret (recipes, clans, vehicles,
//! doors, input snapshots, effect sources) are carried as JSON values and
//! reach plugins untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tether_core::{ConnectionHandle, EffectTarget, GameplayEvent, PlayerId, Session};

/// A connecting player as the engine describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePlayer {
    /// Network connection id.
    pub handle: u64,
    /// Steam id.
    pub steam_id: u64,
    /// Display name; missing or empty names become `"Unnamed"`.
    #[serde(default)]
    pub name: Option<String>,
    /// Remote IP address.
    #[serde(default)]
    pub address: String,
    /// Whether the engine lists the player as an administrator.
    #[serde(default)]
    pub admin: bool,
    /// Client language code.
    #[serde(default)]
    pub language: Option<String>,
}

impl NativePlayer {
    /// Builds the session for this connection.
    pub fn into_session(self) -> Session {
        Session::builder(ConnectionHandle(self.handle), PlayerId(self.steam_id))
            .name(self.name)
            .address(self.address)
            .admin(self.admin)
            .language(self.language)
            .build()
    }
}

/// What an entity effect landed on.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeTarget {
    /// An AI entity, described by the engine.
    Creature(Value),
    /// An entity owned by the player on this connection.
    Player(u64),
    /// Anything else.
    Other,
}

impl From<NativeTarget> for EffectTarget {
    fn from(target: NativeTarget) -> Self {
        match target {
            NativeTarget::Creature(entity) => Self::Creature(entity),
            NativeTarget::Player(handle) => Self::Player(ConnectionHandle(handle)),
            NativeTarget::Other => Self::Other,
        }
    }
}

/// Gameplay callbacks with the same shape on both branches.
#[derive(Debug, Clone, PartialEq)]
pub enum GameplayCallback {
    /// `ICanCraft`.
    CanCraft {
        /// Connection.
        player: u64,
        /// Recipe.
        recipe: Value,
    },
    /// `IOnPlayerClaimTerritory`.
    ClaimTerritory {
        /// Connection.
        player: u64,
        /// Clan.
        clan: Value,
        /// Control point.
        point: i64,
    },
    /// `IOnPlayerClaimedTerritory`.
    ClaimedTerritory {
        /// Connection.
        player: u64,
        /// Clan.
        clan: Value,
        /// Control point.
        point: i64,
    },
    /// `IOnPlayerInput`.
    Input {
        /// Connection.
        player: u64,
        /// Input snapshot.
        input: Value,
    },
    /// `IOnPlayerSuicide`.
    Suicide {
        /// Connection.
        player: u64,
    },
    /// `IOnPlayerVoice`.
    Voice {
        /// Connection.
        player: u64,
    },
    /// `ICanEnterVehicle`.
    CanEnterVehicle {
        /// Connection.
        player: u64,
        /// Vehicle.
        vehicle: Value,
    },
    /// `ICanExitVehicle`.
    CanExitVehicle {
        /// Connection.
        player: u64,
        /// Vehicle.
        vehicle: Value,
    },
    /// `IOnEnterVehicle`.
    EnterVehicle {
        /// Connection.
        player: u64,
        /// Vehicle.
        vehicle: Value,
    },
    /// `IOnExitVehicle`.
    ExitVehicle {
        /// Connection.
        player: u64,
        /// Vehicle.
        vehicle: Value,
    },
}

impl From<GameplayCallback> for GameplayEvent {
    fn from(callback: GameplayCallback) -> Self {
        let handle = ConnectionHandle;
        match callback {
            GameplayCallback::CanCraft { player, recipe } => Self::Craft {
                handle: handle(player),
                recipe,
            },
            GameplayCallback::ClaimTerritory {
                player,
                clan,
                point,
            } => Self::ClaimTerritory {
                handle: handle(player),
                clan,
                point,
            },
            GameplayCallback::ClaimedTerritory {
                player,
                clan,
                point,
            } => Self::ClaimedTerritory {
                handle: handle(player),
                clan,
                point,
            },
            GameplayCallback::Input { player, input } => Self::Input {
                handle: handle(player),
                input,
            },
            GameplayCallback::Suicide { player } => Self::Suicide {
                handle: handle(player),
            },
            GameplayCallback::Voice { player } => Self::Voice {
                handle: handle(player),
            },
            GameplayCallback::CanEnterVehicle { player, vehicle } => Self::CanEnterVehicle {
                handle: handle(player),
                vehicle,
            },
            GameplayCallback::CanExitVehicle { player, vehicle } => Self::CanExitVehicle {
                handle: handle(player),
                vehicle,
            },
            GameplayCallback::EnterVehicle { player, vehicle } => Self::EnteredVehicle {
                handle: handle(player),
                vehicle,
            },
            GameplayCallback::ExitVehicle { player, vehicle } => Self::ExitedVehicle {
                handle: handle(player),
                vehicle,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_player_from_json() {
        let player: NativePlayer = serde_json::from_value(json!({
            "handle": 4,
            "steam_id": 76561198000000000u64,
            "address": "10.0.0.9",
        }))
        .unwrap();

        let session = player.into_session();
        assert_eq!(session.handle(), ConnectionHandle(4));
        assert_eq!(session.id(), PlayerId(76561198000000000));
        assert_eq!(session.display_name(), "Unnamed");
        assert!(!session.is_admin());
        assert_eq!(session.language(), None);
    }

    #[test]
    fn test_gameplay_mapping() {
        let event = GameplayEvent::from(GameplayCallback::ExitVehicle {
            player: 2,
            vehicle: json!({"kind": "goat"}),
        });
        assert_eq!(
            event,
            GameplayEvent::ExitedVehicle {
                handle: ConnectionHandle(2),
                vehicle: json!({"kind": "goat"}),
            }
        );
    }
}
