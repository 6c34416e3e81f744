//! Game provider identity.

use serde::Serialize;

/// Game name reported to plugins.
pub const GAME_NAME: &str = "Hurtworld";

/// Steam app id of the game client.
pub const CLIENT_APP_ID: u32 = 393_420;

/// Steam app id of the dedicated server.
pub const SERVER_APP_ID: u32 = 405_100;

/// Branch name of the public (legacy) API generation.
pub const BRANCH_PUBLIC: &str = "public";

/// Branch name of the itemv2 API generation.
pub const BRANCH_ITEMV2: &str = "itemv2";

/// Provider metadata, serializable for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Game name.
    pub game_name: &'static str,
    /// Client app id.
    pub client_app_id: u32,
    /// Server app id.
    pub server_app_id: u32,
    /// Active API branch.
    pub branch: &'static str,
}

impl ProviderInfo {
    /// Provider metadata for `branch`.
    pub const fn new(branch: &'static str) -> Self {
        Self {
            game_name: GAME_NAME,
            client_app_id: CLIENT_APP_ID,
            server_app_id: SERVER_APP_ID,
            branch,
        }
    }
}
