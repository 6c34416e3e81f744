//! Canonical hook names.
//!
//! Specific-tier hooks receive engine [`Session`](tether_core::Session)s;
//! universal-tier hooks receive
//! [`UniversalPlayer`](tether_core::UniversalPlayer)s or primitive identity
//! fields. Some hooks share a name across both tiers and are told apart by
//! their arguments.

use chrono::{DateTime, Duration, Utc};

// =============================================================================
// Lifecycle
// =============================================================================

/// Specific approval: `(session)`.
pub const CAN_CLIENT_LOGIN: &str = "CanClientLogin";
/// Universal approval: `(name, id, ip)`.
pub const CAN_PLAYER_LOGIN: &str = "CanPlayerLogin";
/// Deprecated alias of [`CAN_PLAYER_LOGIN`].
pub const CAN_USER_LOGIN: &str = "CanUserLogin";

/// Specific post-approval: `(session)`.
pub const ON_PLAYER_APPROVE: &str = "OnPlayerApprove";
/// Universal post-approval: `(name, id, ip)`.
pub const ON_PLAYER_APPROVED: &str = "OnPlayerApproved";
/// Deprecated alias of [`ON_PLAYER_APPROVED`].
pub const ON_USER_APPROVED: &str = "OnUserApproved";

/// Chat: `(session, message)` or `(player, message)`.
pub const ON_PLAYER_CHAT: &str = "OnPlayerChat";
/// Deprecated alias of universal [`ON_PLAYER_CHAT`].
pub const ON_USER_CHAT: &str = "OnUserChat";

/// Command: `(session, name, args)` or `(player, name, args)`.
pub const ON_PLAYER_COMMAND: &str = "OnPlayerCommand";
/// Deprecated alias of universal [`ON_PLAYER_COMMAND`].
pub const ON_USER_COMMAND: &str = "OnUserCommand";

/// Universal connect: `(player)`.
pub const ON_PLAYER_CONNECTED: &str = "OnPlayerConnected";
/// Deprecated alias of [`ON_PLAYER_CONNECTED`].
pub const ON_USER_CONNECTED: &str = "OnUserConnected";

/// Disconnect: `(session)` or `(player, reason)`.
pub const ON_PLAYER_DISCONNECTED: &str = "OnPlayerDisconnected";
/// Deprecated alias of universal [`ON_PLAYER_DISCONNECTED`].
pub const ON_USER_DISCONNECTED: &str = "OnUserDisconnected";

// =============================================================================
// Gameplay
// =============================================================================

/// `(session, recipe)`.
pub const CAN_CRAFT: &str = "CanCraft";
/// `(session, clan, point)`.
pub const ON_PLAYER_CLAIM_TERRITORY: &str = "OnPlayerClaimTerritory";
/// `(session, clan, point)`.
pub const ON_PLAYER_CLAIMED_TERRITORY: &str = "OnPlayerClaimedTerritory";
/// `(session, input)`.
pub const ON_PLAYER_INPUT: &str = "OnPlayerInput";
/// `(session)`.
pub const ON_PLAYER_SUICIDE: &str = "OnPlayerSuicide";
/// `(session)`.
pub const ON_PLAYER_VOICE: &str = "OnPlayerVoice";
/// `(entity, source)`.
pub const ON_ENTITY_TAKE_DAMAGE: &str = "OnEntityTakeDamage";
/// `(entity, source)`.
pub const ON_ENTITY_HEAL: &str = "OnEntityHeal";
/// `(session, source)`.
pub const ON_PLAYER_TAKE_DAMAGE: &str = "OnPlayerTakeDamage";
/// `(session, source)`.
pub const ON_PLAYER_HEAL: &str = "OnPlayerHeal";
/// `(door, session)`.
pub const ON_SINGLE_DOOR_USED: &str = "OnSingleDoorUsed";
/// `(door, session)`.
pub const ON_DOUBLE_DOOR_USED: &str = "OnDoubleDoorUsed";
/// `(door, session)`.
pub const ON_GARAGE_DOOR_USED: &str = "OnGarageDoorUsed";
/// `(session, vehicle)`.
pub const CAN_ENTER_VEHICLE: &str = "CanEnterVehicle";
/// `(session, vehicle)`.
pub const CAN_EXIT_VEHICLE: &str = "CanExitVehicle";
/// `(session, vehicle)`.
pub const ON_ENTER_VEHICLE: &str = "OnEnterVehicle";
/// `(session, vehicle)`.
pub const ON_EXIT_VEHICLE: &str = "OnExitVehicle";

// =============================================================================
// Sunset
// =============================================================================

const LEGACY_ALIAS_SUNSET_SECS: i64 = 1_530_403_200;

/// Sunset of the `OnUser*`/`CanUser*` aliases: 2018-07-01T00:00:00Z.
pub fn legacy_alias_sunset() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + Duration::seconds(LEGACY_ALIAS_SUNSET_SECS)
}

/// Every `(deprecated, replacement)` pair retired at [`legacy_alias_sunset`].
pub const LEGACY_ALIASES: [(&str, &str); 6] = [
    (CAN_USER_LOGIN, CAN_PLAYER_LOGIN),
    (ON_USER_APPROVED, ON_PLAYER_APPROVED),
    (ON_USER_CHAT, ON_PLAYER_CHAT),
    (ON_USER_COMMAND, ON_PLAYER_COMMAND),
    (ON_USER_CONNECTED, ON_PLAYER_CONNECTED),
    (ON_USER_DISCONNECTED, ON_PLAYER_DISCONNECTED),
];
