//! Host traits and the deferred action queue.
//!
//! The engine must not tear down a connection from inside one of its own
//! callbacks. Disconnects requested during dispatch are queued and applied on
//! the host's next [`tick`](DeferredActions::flush).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use tether_core::{ConnectionHandle, console_chat_line, format_direct};

/// Operations common to both API branches.
pub trait HurtworldHost: Send + Sync {
    /// Kicks `handle` with `reason`. Called only from a tick.
    fn disconnect(&self, handle: ConnectionHandle, reason: &str);

    /// Sends a chat line to one player.
    fn send_player_chat(&self, handle: ConnectionHandle, message: &str) -> anyhow::Result<()>;

    /// Writes a line to the server console.
    fn console_log(&self, line: &str);
}

impl<T: HurtworldHost + ?Sized> HurtworldHost for Arc<T> {
    fn disconnect(&self, handle: ConnectionHandle, reason: &str) {
        (**self).disconnect(handle, reason);
    }

    fn send_player_chat(&self, handle: ConnectionHandle, message: &str) -> anyhow::Result<()> {
        (**self).send_player_chat(handle, message)
    }

    fn console_log(&self, line: &str) {
        (**self).console_log(line);
    }
}

/// An action waiting for the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredAction {
    /// Disconnect a connection.
    Disconnect {
        /// Connection.
        handle: ConnectionHandle,
        /// Reason shown to the player.
        reason: String,
    },
}

/// FIFO of actions deferred to the next tick.
#[derive(Debug, Default)]
pub struct DeferredActions {
    queue: Mutex<VecDeque<DeferredAction>>,
}

impl DeferredActions {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `action`.
    pub fn push(&self, action: DeferredAction) {
        self.queue.lock().push_back(action);
    }

    /// Number of queued actions.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Applies every queued action against `host`, oldest first.
    ///
    /// Actions queued while flushing wait for the next flush.
    pub fn flush(&self, host: &dyn HurtworldHost) -> usize {
        let actions: Vec<_> = self.queue.lock().drain(..).collect();
        for action in &actions {
            match action {
                DeferredAction::Disconnect { handle, reason } => {
                    debug!(%handle, reason = %reason, "Applying deferred disconnect");
                    host.disconnect(*handle, reason);
                }
            }
        }
        actions.len()
    }
}

/// Shared engine plumbing: deferred teardown and direct messages.
pub(crate) struct EngineCore<H> {
    pub(crate) host: H,
    pub(crate) deferred: DeferredActions,
}

impl<H: HurtworldHost> EngineCore<H> {
    pub(crate) fn new(host: H) -> Self {
        Self {
            host,
            deferred: DeferredActions::new(),
        }
    }

    pub(crate) fn schedule_disconnect(&self, handle: ConnectionHandle, reason: &str) {
        self.deferred.push(DeferredAction::Disconnect {
            handle,
            reason: reason.to_string(),
        });
    }

    pub(crate) fn message(&self, handle: ConnectionHandle, prefix: Option<&str>, message: &str) {
        if message.is_empty() {
            return;
        }
        let line = format_direct(prefix, message);
        if let Err(e) = self.host.send_player_chat(handle, &line) {
            warn!(%handle, error = %e, "Failed to send chat message");
        }
    }

    /// Sends a broadcast through `send` and echoes it to the console.
    pub(crate) fn broadcast_with<F>(&self, message: &str, formatted: &str, send: F)
    where
        F: FnOnce(&H, &str) -> anyhow::Result<()>,
    {
        if message.is_empty() {
            return;
        }
        if let Err(e) = send(&self.host, formatted) {
            warn!(error = %e, "Failed to broadcast chat message");
        }
        self.host.console_log(&console_chat_line(message));
    }

    pub(crate) fn tick(&self) -> usize {
        self.deferred.flush(&self.host)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every host call.
    #[derive(Debug, Default)]
    pub struct RecordingHost {
        pub calls: Mutex<Vec<String>>,
        pub fail_sends: bool,
    }

    impl RecordingHost {
        pub fn failing() -> Self {
            Self {
                fail_sends: true,
                ..Default::default()
            }
        }

        pub fn record(&self, call: String) -> anyhow::Result<()> {
            self.calls.lock().push(call);
            if self.fail_sends {
                anyhow::bail!("host is shutting down");
            }
            Ok(())
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl HurtworldHost for RecordingHost {
        fn disconnect(&self, handle: ConnectionHandle, reason: &str) {
            self.calls.lock().push(format!("disconnect {handle} {reason}"));
        }

        fn send_player_chat(&self, handle: ConnectionHandle, message: &str) -> anyhow::Result<()> {
            self.record(format!("chat {handle} {message}"))
        }

        fn console_log(&self, line: &str) {
            self.calls.lock().push(format!("console {line}"));
        }
    }
}
