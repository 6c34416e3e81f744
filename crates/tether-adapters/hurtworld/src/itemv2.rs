//! The `itemv2` API branch.
//!
//! This generation reports a single chat callback for both chat and
//! commands, tags entity effects with a typed effect kind instead of a stat
//! name, folds the three door variants into one callback and passes a
//! disconnect reason.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use tether_core::{
    ConnectionHandle, DoorKind, Engine, EngineEvent, EventSource, GameplayEvent,
    format_broadcast,
};
use tether_framework::CommandSettings;

use crate::host::{EngineCore, HurtworldHost};
use crate::native::{GameplayCallback, NativePlayer, NativeTarget};
use crate::provider::BRANCH_ITEMV2;

/// Kind of a fluid entity effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FluidEffect {
    /// Health.
    Health,
    /// Any other stat.
    Other,
}

/// A callback from the itemv2 engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemV2Callback {
    /// Connection approval.
    Approve(NativePlayer),
    /// Player finished loading.
    Connected {
        /// Connection.
        player: u64,
    },
    /// Player left.
    Disconnected {
        /// Connection.
        player: u64,
        /// Engine reason.
        reason: String,
    },
    /// A chat line, command or not.
    ChatMessage {
        /// Sender.
        sender: u64,
        /// Text.
        text: String,
    },
    /// An effect applied to an entity.
    EntityEffect {
        /// Affected entity.
        target: NativeTarget,
        /// Effect kind.
        effect: FluidEffect,
        /// Signed amount.
        amount: f64,
        /// Effect source.
        source: Value,
    },
    /// Any door was used.
    DoorUsed {
        /// Door variant.
        kind: DoorKind,
        /// Door.
        door: Value,
        /// Last user.
        last_user: Option<u64>,
    },
    /// Callbacks shared with the public branch.
    Gameplay(GameplayCallback),
}

/// Translates itemv2 callbacks into canonical events.
///
/// The engine hands over commands as ordinary chat, so the adapter needs the
/// same prefix the command parser uses. Build it with
/// [`from_settings`](Self::from_settings) from the bridge's `commands` config.
#[derive(Debug, Clone, Copy)]
pub struct ItemV2Adapter {
    prefix: char,
}

impl Default for ItemV2Adapter {
    fn default() -> Self {
        Self::from_settings(&CommandSettings::default())
    }
}

impl ItemV2Adapter {
    /// Creates an adapter that treats lines starting with `prefix` as commands.
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    /// Creates an adapter using the command parser's prefix.
    pub fn from_settings(settings: &CommandSettings) -> Self {
        Self::new(settings.prefix)
    }

    /// The command prefix.
    pub fn prefix(&self) -> char {
        self.prefix
    }
}

impl EventSource for ItemV2Adapter {
    type Native = ItemV2Callback;

    fn branch(&self) -> &'static str {
        BRANCH_ITEMV2
    }

    fn translate(&self, native: ItemV2Callback) -> Option<EngineEvent> {
        let event = match native {
            ItemV2Callback::Approve(player) => EngineEvent::Approve(player.into_session()),
            ItemV2Callback::Connected { player } => EngineEvent::Connected {
                handle: ConnectionHandle(player),
            },
            ItemV2Callback::Disconnected { player, reason } => EngineEvent::Disconnected {
                handle: ConnectionHandle(player),
                reason: Some(reason).filter(|r| !r.is_empty()),
            },
            ItemV2Callback::ChatMessage { text, .. } if text.is_empty() => return None,
            ItemV2Callback::ChatMessage { sender, text } if text.starts_with(self.prefix) => {
                EngineEvent::Command {
                    handle: ConnectionHandle(sender),
                    line: text,
                }
            }
            ItemV2Callback::ChatMessage { sender, text } => EngineEvent::Chat {
                handle: ConnectionHandle(sender),
                message: text,
            },
            ItemV2Callback::EntityEffect {
                target,
                effect,
                amount,
                source,
            } => EngineEvent::Gameplay(GameplayEvent::EntityEffect {
                target: target.into(),
                health: effect == FluidEffect::Health,
                amount,
                source,
            }),
            ItemV2Callback::DoorUsed {
                kind,
                door,
                last_user,
            } => EngineEvent::Gameplay(GameplayEvent::DoorUsed {
                kind,
                door,
                last_user: last_user.map(ConnectionHandle),
            }),
            ItemV2Callback::Gameplay(callback) => EngineEvent::Gameplay(callback.into()),
        };
        trace!(kind = event.kind(), "Translated itemv2 callback");
        Some(event)
    }
}

/// Host operations only the itemv2 engine has.
pub trait ItemV2Host: HurtworldHost {
    /// Sends a server chat message to every player.
    fn send_server_chat(&self, message: &str) -> anyhow::Result<()>;
}

impl<T: ItemV2Host + ?Sized> ItemV2Host for Arc<T> {
    fn send_server_chat(&self, message: &str) -> anyhow::Result<()> {
        (**self).send_server_chat(message)
    }
}

/// [`Engine`] for the itemv2 branch.
pub struct ItemV2Engine<H> {
    core: EngineCore<H>,
}

impl<H: ItemV2Host> ItemV2Engine<H> {
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

impl<H: ItemV2Host> Engine for ItemV2Engine<H> {
    fn branch(&self) -> &str {
        BRANCH_ITEMV2
    }

    fn schedule_disconnect(&self, handle: ConnectionHandle, reason: &str) {
        self.core.schedule_disconnect(handle, reason);
    }

    fn send_message(&self, handle: ConnectionHandle, message: &str) {
        self.core.message(handle, None, message);
    }

    fn broadcast(&self, prefix: Option<&str>, message: &str) {
        let formatted = format_broadcast(prefix, message);
        self.core
            .broadcast_with(message, &formatted, |host, line| host.send_server_chat(line));
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;
    use tether_core::{EffectTarget, HookCall};
    use tether_framework::{CommandOutcome, EventResponse, HookDispatcher, hooks};

    use super::*;
    use crate::host::testing::RecordingHost;

    impl ItemV2Host for RecordingHost {
        fn send_server_chat(&self, message: &str) -> anyhow::Result<()> {
            self.record(format!("server {message}"))
        }
    }

    fn chat(sender: u64, text: &str) -> ItemV2Callback {
        ItemV2Callback::ChatMessage {
            sender,
            text: text.into(),
        }
    }

    #[test]
    fn test_chat_split_on_prefix() {
        let adapter = ItemV2Adapter::default();
        assert_eq!(adapter.branch(), "itemv2");

        assert!(matches!(
            adapter.translate(chat(1, "/kit starter")),
            Some(EngineEvent::Command { line, .. }) if line == "/kit starter"
        ));
        assert!(matches!(
            adapter.translate(chat(1, "hello")),
            Some(EngineEvent::Chat { message, .. }) if message == "hello"
        ));
        assert!(adapter.translate(chat(1, "")).is_none());

        let bang = ItemV2Adapter::new('!');
        assert!(matches!(
            bang.translate(chat(1, "/kit")),
            Some(EngineEvent::Chat { .. })
        ));
    }

    #[test]
    fn test_prefix_follows_command_settings() {
        let settings = CommandSettings {
            prefix: '!',
            ..Default::default()
        };
        let adapter = ItemV2Adapter::from_settings(&settings);
        assert_eq!(adapter.prefix(), '!');
        assert!(matches!(
            adapter.translate(chat(3, "!kit")),
            Some(EngineEvent::Command { line, .. }) if line == "!kit"
        ));
        assert!(matches!(
            adapter.translate(chat(3, "/kit")),
            Some(EngineEvent::Chat { .. })
        ));
    }

    #[test]
    fn test_translate_effects_and_disconnect() {
        let adapter = ItemV2Adapter::default();
        let event = adapter
            .translate(ItemV2Callback::EntityEffect {
                target: NativeTarget::Creature(json!({"kind": "yeti"})),
                effect: FluidEffect::Health,
                amount: 12.5,
                source: Value::Null,
            })
            .unwrap();
        assert!(matches!(
            event,
            EngineEvent::Gameplay(GameplayEvent::EntityEffect {
                target: EffectTarget::Creature(_),
                health: true,
                ..
            })
        ));

        let event = adapter
            .translate(ItemV2Callback::Disconnected {
                player: 4,
                reason: "Timed out".into(),
            })
            .unwrap();
        assert!(matches!(
            event,
            EngineEvent::Disconnected { reason: Some(r), .. } if r == "Timed out"
        ));

        let event = adapter
            .translate(ItemV2Callback::Disconnected {
                player: 4,
                reason: String::new(),
            })
            .unwrap();
        assert!(matches!(event, EngineEvent::Disconnected { reason: None, .. }));
    }

    #[test]
    fn test_broadcast_uses_server_chat() {
        let engine = ItemV2Engine::new(RecordingHost::default());
        engine.broadcast(Some("Admin"), "wipe tonight");
        engine.message(ConnectionHandle(2), Some("[Shop]"), "sold");
        assert_eq!(
            engine.host().calls(),
            vec![
                "server Admin: wipe tonight",
                "console [Chat] wipe tonight",
                "chat #2 [Shop] sold",
            ]
        );
    }

    #[tokio::test]
    async fn test_command_through_dispatcher() {
        let host = Arc::new(RecordingHost::default());
        let engine = Arc::new(ItemV2Engine::new(host.clone()));
        let dispatcher = HookDispatcher::builder(engine.clone()).build();
        let adapter = ItemV2Adapter::default();

        let approve = adapter
            .translate(ItemV2Callback::Approve(NativePlayer {
                handle: 5,
                steam_id: 500,
                name: None,
                address: "10.0.0.5".into(),
                admin: false,
                language: Some("en".into()),
            }))
            .unwrap();
        let response = dispatcher.dispatch(approve).await.unwrap();
        assert_eq!(response.to_value(), Value::Null);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        dispatcher
            .registry()
            .subscribe("jail", hooks::ON_PLAYER_COMMAND, move |call: HookCall| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(call.name().to_string());
                    false
                }
            });

        let command = adapter.translate(chat(5, "/home")).unwrap();
        let response = dispatcher.dispatch(command).await.unwrap();
        assert!(matches!(
            response,
            EventResponse::Command(CommandOutcome::Blocked(_))
        ));
        assert_eq!(response.to_value(), Value::Bool(true));
        // Specific and universal tiers both run before the player has loaded.
        assert_eq!(*seen.lock(), vec![hooks::ON_PLAYER_COMMAND.to_string(); 2]);
        assert_eq!(engine.pending(), 0);
    }
}
