//! The outbound engine boundary.
//!
//! The dispatcher never talks to engine managers directly. Everything it needs
//! from the host (disconnecting a player, sending chat) goes through
//! [`Engine`], which is injected at construction time.

use crate::identity::ConnectionHandle;

/// Actions the bridge can ask the host engine to perform.
///
/// Implementations are called from inside event dispatch and must not block.
/// Disconnects in particular are deferred: the engine queues them and applies
/// them on its next tick.
pub trait Engine: Send + Sync {
    /// Branch name of the running engine (`"public"` or `"itemv2"`).
    fn branch(&self) -> &str;

    /// Queues a disconnect of `handle` with `reason`.
    fn schedule_disconnect(&self, handle: ConnectionHandle, reason: &str);

    /// Sends a chat message to one player.
    fn send_message(&self, handle: ConnectionHandle, message: &str);

    /// Sends a chat message to every player and echoes it to the console.
    fn broadcast(&self, prefix: Option<&str>, message: &str);
}

/// Formats a broadcast line: `"prefix: message"`, or the bare message.
pub fn format_broadcast(prefix: Option<&str>, message: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}: {message}"),
        None => message.to_string(),
    }
}

/// Formats a direct message line: `"prefix message"`, or the bare message.
pub fn format_direct(prefix: Option<&str>, message: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix} {message}"),
        None => message.to_string(),
    }
}

/// The console echo written for every broadcast.
pub fn console_chat_line(message: &str) -> String {
    format!("[Chat] {message}")
}
