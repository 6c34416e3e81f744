//! The hook dispatcher.
//!
//! [`HookDispatcher`] turns canonical [`EngineEvent`]s into tiered hook calls
//! and turns the merged results back into decisions for the engine.
//!
//! # Connection Lifecycle
//!
//! ```text
//!            approve               connected             disconnected
//! Pending ─────────────▶ Approved ────────────▶ Loaded ────────────────▶ gone
//!    │
//!    └── rejected ──▶ gone (deferred disconnect, no disconnect hooks)
//! ```
//!
//! Disconnect hooks fire only for sessions that reached `Loaded`. Sessions are
//! removed from the directory on rejection and on every disconnect.
//!
//! # Lookup Misses
//!
//! Events for a handle that has no session (never approved, or already torn
//! down by a deferred disconnect) are dropped and logged at debug level.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, debug_span, info};

use tether_core::{
    Clock, ConnectionHandle, DirectoryResult, DoorKind, EffectTarget, Engine, EngineEvent,
    GameplayEvent, HookArg, HookCall, HookResult, IdentityRegistry, MemoryIdentityRegistry,
    PlayerManager, Session, SessionDirectory, SystemClock, UniversalPlayer,
};

use crate::command::{CommandRouter, RouteOutcome};
use crate::deprecation::LegacyAliases;
use crate::hooks;
use crate::registry::HookRegistry;
use crate::tier::{HookInvocation, TierResults};

// =============================================================================
// Settings
// =============================================================================

/// Dispatcher behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Group every player is added to on connect.
    pub players_group: String,
    /// Group administrators are added to on connect.
    pub admin_group: String,
    /// Universal disconnect reason when the engine reports none.
    pub disconnect_reason: String,
    /// Disconnect reason for rejections that carry none.
    pub rejection_reason: String,
    /// Warn plugins that subscribe to deprecated aliases.
    pub warn_deprecated: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            players_group: "default".into(),
            admin_group: "admin".into(),
            disconnect_reason: "Unknown".into(),
            rejection_reason: "Connection was rejected".into(),
            warn_deprecated: true,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// The result of connection approval.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalDecision {
    /// The connection was rejected and a disconnect was scheduled.
    Rejected {
        /// Reason sent to the player.
        reason: String,
    },
    /// The connection was accepted; carries the merged post-approval result.
    Approved(HookResult),
}

impl ApprovalDecision {
    /// Whether the connection was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// The result of a chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The line did not parse as a command.
    NotCommand,
    /// A hook tier had an opinion, so routing was skipped.
    Blocked(HookResult),
    /// The command went through the router.
    Routed(RouteOutcome),
}

/// What the dispatcher hands back to the engine adapter for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResponse {
    /// No session for the event; nothing happened.
    Dropped,
    /// Connection approval.
    Approval(ApprovalDecision),
    /// Merged result of a returning hook.
    Hook(HookResult),
    /// Chat command handling.
    Command(CommandOutcome),
    /// A void event completed.
    Done,
}

impl EventResponse {
    /// The loosely typed value returned to the engine callback.
    ///
    /// A rejected approval returns `true`: the bridge has taken over the
    /// connection. Commands return `true` once parsed so the engine does not
    /// echo them as chat.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Dropped | Self::Done => Value::Null,
            Self::Approval(ApprovalDecision::Rejected { .. }) => Value::Bool(true),
            Self::Approval(ApprovalDecision::Approved(result)) | Self::Hook(result) => {
                result.to_value()
            }
            Self::Command(CommandOutcome::NotCommand) => Value::Null,
            Self::Command(_) => Value::Bool(true),
        }
    }
}

// =============================================================================
// HookDispatcher
// =============================================================================

/// Routes canonical events through the hook tiers.
pub struct HookDispatcher {
    directory: Arc<SessionDirectory>,
    players: Arc<PlayerManager>,
    identities: Arc<dyn IdentityRegistry>,
    registry: Arc<HookRegistry>,
    router: Arc<CommandRouter>,
    engine: Arc<dyn Engine>,
    clock: Arc<dyn Clock>,
    aliases: LegacyAliases,
    settings: DispatchSettings,
}

impl HookDispatcher {
    /// Starts building a dispatcher around `engine`.
    pub fn builder(engine: Arc<dyn Engine>) -> HookDispatcherBuilder {
        HookDispatcherBuilder {
            engine,
            directory: None,
            players: None,
            identities: None,
            registry: None,
            router: None,
            clock: None,
            settings: DispatchSettings::default(),
        }
    }

    /// The session directory.
    pub fn directory(&self) -> &Arc<SessionDirectory> {
        &self.directory
    }

    /// The universal player manager.
    pub fn players(&self) -> &Arc<PlayerManager> {
        &self.players
    }

    /// The hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// The command router.
    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// The engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// The active settings.
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Drops every hook subscription and command owned by `plugin`.
    pub fn unload_plugin(&self, plugin: &str) {
        let hooks = self.registry.unsubscribe_plugin(plugin);
        let commands = self.router.unregister_plugin(plugin);
        info!(plugin = %plugin, hooks, commands, "Plugin unloaded from dispatcher");
    }

    async fn run(&self, invocation: HookInvocation<'_>) -> TierResults {
        invocation.invoke(&self.registry, self.clock.now()).await
    }

    /// The universal player for `session`, bound or not yet loaded.
    fn universal_player(&self, session: &Session) -> Option<Arc<UniversalPlayer>> {
        session
            .player()
            .cloned()
            .or_else(|| self.players.find_by_id(session.id()))
    }

    fn lookup(&self, handle: ConnectionHandle, event: &'static str) -> Option<Arc<Session>> {
        let session = self.directory.find_by_handle(handle);
        if session.is_none() {
            debug!(%handle, event, "No session for handle, event dropped");
        }
        session
    }

    /// Dispatches one canonical event.
    ///
    /// # Errors
    ///
    /// Only directory precondition violations during approval are surfaced.
    pub async fn dispatch(&self, event: EngineEvent) -> DirectoryResult<EventResponse> {
        let span = debug_span!("dispatch", kind = event.kind(), handle = ?event.handle());
        async move {
            Ok(match event {
                EngineEvent::Approve(session) => {
                    EventResponse::Approval(self.on_player_approve(session).await?)
                }
                EngineEvent::Connected { handle } => {
                    match self.directory.find_by_handle(handle) {
                        Some(_) => {
                            self.on_player_connected(handle).await;
                            EventResponse::Done
                        }
                        None => self.dropped(handle, "connected"),
                    }
                }
                EngineEvent::Disconnected { handle, reason } => {
                    match self.directory.find_by_handle(handle) {
                        Some(_) => {
                            self.on_player_disconnected(handle, reason.as_deref()).await;
                            EventResponse::Done
                        }
                        None => self.dropped(handle, "disconnected"),
                    }
                }
                EngineEvent::Chat { handle, message } => self
                    .on_player_chat(handle, &message)
                    .await
                    .map_or(EventResponse::Dropped, EventResponse::Hook),
                EngineEvent::Command { handle, line } => self
                    .on_player_command(handle, &line)
                    .await
                    .map_or(EventResponse::Dropped, EventResponse::Command),
                EngineEvent::Gameplay(event) => self
                    .on_gameplay(event)
                    .await
                    .map_or(EventResponse::Dropped, EventResponse::Hook),
            })
        }
        .instrument(span)
        .await
    }

    fn dropped(&self, handle: ConnectionHandle, event: &'static str) -> EventResponse {
        debug!(%handle, event, "No session for handle, event dropped");
        EventResponse::Dropped
    }

    // -------------------------------------------------------------------------
    // Approval
    // -------------------------------------------------------------------------

    /// Runs connection approval for a freshly built session.
    ///
    /// On rejection a disconnect is scheduled and the handle and identity are
    /// both removed from the directory. On acceptance the session replaces any
    /// previous entry for the same handle or identity, and the post-approval
    /// tiers decide the final result.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`](tether_core::DirectoryError) if the
    /// session cannot be registered.
    pub async fn on_player_approve(&self, session: Session) -> DirectoryResult<ApprovalDecision> {
        let session = Arc::new(session);
        let handle = session.handle();
        let id = session.id();
        let name = session.display_name();
        let identity = || -> Vec<HookArg> {
            vec![
                name.as_str().into(),
                id.to_string().into(),
                session.address().into(),
            ]
        };

        self.players.player_join(id, &name);

        let login = self
            .run(
                HookInvocation::new("approval")
                    .specific(HookCall::new(
                        hooks::CAN_CLIENT_LOGIN,
                        vec![Arc::clone(&session).into()],
                    ))
                    .universal(HookCall::new(hooks::CAN_PLAYER_LOGIN, identity()))
                    .deprecated(&self.aliases.login),
            )
            .await
            .merged();

        if login.is_rejection() {
            let reason = login
                .rejection_reason()
                .unwrap_or(self.settings.rejection_reason.as_str())
                .to_string();
            self.engine.schedule_disconnect(handle, &reason);
            self.directory.unregister(handle);
            self.directory.unregister_identity(id);
            info!(%handle, player_id = %id, name = %name, reason = %reason, "Connection rejected");
            return Ok(ApprovalDecision::Rejected { reason });
        }

        self.directory.unregister(handle);
        if let Some(stale) = self.directory.unregister_identity(id) {
            debug!(player_id = %id, stale = %stale.handle(), "Replacing stale session for identity");
        }
        self.directory.register(Arc::clone(&session))?;
        info!(%handle, player_id = %id, name = %name, "Connection approved");

        let approved = self
            .run(
                HookInvocation::new("post-approval")
                    .specific(HookCall::new(
                        hooks::ON_PLAYER_APPROVE,
                        vec![Arc::clone(&session).into()],
                    ))
                    .universal(HookCall::new(hooks::ON_PLAYER_APPROVED, identity()))
                    .deprecated(&self.aliases.approved),
            )
            .await
            .merged();

        Ok(ApprovalDecision::Approved(approved))
    }

    // -------------------------------------------------------------------------
    // Connect / Disconnect
    // -------------------------------------------------------------------------

    /// Runs post-approval setup for `handle`.
    ///
    /// Identity sync runs every time and is idempotent. Connect hooks fire
    /// only on the call that loads the session. Returns whether they fired.
    pub async fn on_player_connected(&self, handle: ConnectionHandle) -> bool {
        let Some(session) = self.lookup(handle, "connected") else {
            return false;
        };
        let id = session.id();

        if self.identities.is_loaded() {
            self.identities.update_nickname(id, &session.display_name());
            if !self.identities.user_has_group(id, &self.settings.players_group) {
                self.identities.add_user_group(id, &self.settings.players_group);
            }
            if session.is_admin() && !self.identities.user_has_group(id, &self.settings.admin_group)
            {
                self.identities.add_user_group(id, &self.settings.admin_group);
            }
        }

        if self.identities.language(id).is_none()
            && let Some(language) = session.language()
        {
            self.identities.set_language(id, language);
        }

        let player = self.players.player_connected(&session);
        let player = Arc::clone(session.bind_player(player));

        if !session.mark_loaded() {
            debug!(%handle, player_id = %id, "Session already loaded, connect hooks skipped");
            return false;
        }

        info!(%handle, player_id = %id, name = %player.name(), "Player connected");
        self.run(
            HookInvocation::new("connect")
                .universal(HookCall::new(hooks::ON_PLAYER_CONNECTED, vec![player.into()]))
                .deprecated(&self.aliases.connected),
        )
        .await;
        true
    }

    /// Handles a disconnect for `handle`.
    ///
    /// Hooks fire only if the session was loaded. The session is removed from
    /// the directory either way. Returns whether hooks fired.
    pub async fn on_player_disconnected(
        &self,
        handle: ConnectionHandle,
        reason: Option<&str>,
    ) -> bool {
        let Some(session) = self.lookup(handle, "disconnected") else {
            return false;
        };

        let fired = session.is_loaded();
        if fired {
            let reason = reason.unwrap_or(self.settings.disconnect_reason.as_str());
            let mut invocation = HookInvocation::new("disconnect").specific(HookCall::new(
                hooks::ON_PLAYER_DISCONNECTED,
                vec![Arc::clone(&session).into()],
            ));
            if let Some(player) = session.player() {
                invocation = invocation
                    .universal(HookCall::new(
                        hooks::ON_PLAYER_DISCONNECTED,
                        vec![Arc::clone(player).into(), reason.into()],
                    ))
                    .deprecated(&self.aliases.disconnected);
            }
            self.run(invocation).await;
            self.players.player_disconnected(&session);
            info!(%handle, player_id = %session.id(), reason = %reason, "Player disconnected");
        } else {
            debug!(%handle, player_id = %session.id(), "Session never loaded, disconnect hooks skipped");
        }

        self.directory.unregister(handle);
        fired
    }

    // -------------------------------------------------------------------------
    // Chat
    // -------------------------------------------------------------------------

    /// Runs the chat tiers. `None` if there is no session.
    pub async fn on_player_chat(&self, handle: ConnectionHandle, message: &str) -> Option<HookResult> {
        let session = self.lookup(handle, "chat")?;

        let mut invocation = HookInvocation::new("chat").specific(HookCall::new(
            hooks::ON_PLAYER_CHAT,
            vec![Arc::clone(&session).into(), message.into()],
        ));
        if let Some(player) = self.universal_player(&session) {
            invocation = invocation
                .universal(HookCall::new(
                    hooks::ON_PLAYER_CHAT,
                    vec![player.into(), message.into()],
                ))
                .deprecated(&self.aliases.chat);
        }

        Some(self.run(invocation).await.merged())
    }

    /// Handles a chat command. `None` if there is no session.
    ///
    /// Any tier with an opinion blocks routing.
    pub async fn on_player_command(
        &self,
        handle: ConnectionHandle,
        line: &str,
    ) -> Option<CommandOutcome> {
        let session = self.lookup(handle, "command")?;
        let Some(invocation) = self.router.parser().parse(line) else {
            return Some(CommandOutcome::NotCommand);
        };

        let name = invocation.name();
        let args = invocation.args().to_vec();
        let mut tiers = HookInvocation::new("command").specific(HookCall::new(
            hooks::ON_PLAYER_COMMAND,
            vec![Arc::clone(&session).into(), name.into(), args.clone().into()],
        ));
        if let Some(player) = self.universal_player(&session) {
            tiers = tiers
                .universal(HookCall::new(
                    hooks::ON_PLAYER_COMMAND,
                    vec![player.into(), name.into(), args.into()],
                ))
                .deprecated(&self.aliases.command);
        }

        let results = self.run(tiers).await;
        if results.any_opinion() {
            debug!(%handle, command = %name, "Command blocked by hook");
            return Some(CommandOutcome::Blocked(results.merged()));
        }

        Some(CommandOutcome::Routed(
            self.router.route_invocation(invocation, &session).await,
        ))
    }

    // -------------------------------------------------------------------------
    // Gameplay
    // -------------------------------------------------------------------------

    /// Runs the specific-tier hook for a gameplay event.
    ///
    /// Returns `None` when the event is dropped. Void hooks yield `NoOpinion`.
    pub async fn on_gameplay(&self, event: GameplayEvent) -> Option<HookResult> {
        let kind = event.kind();
        let (call, returns) = match event {
            GameplayEvent::Craft { handle, recipe } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::CAN_CRAFT, vec![session.into(), recipe.into()]), true)
            }
            GameplayEvent::ClaimTerritory { handle, clan, point } => {
                let session = self.lookup(handle, kind)?;
                let args = vec![session.into(), clan.into(), point.into()];
                (call(hooks::ON_PLAYER_CLAIM_TERRITORY, args), true)
            }
            GameplayEvent::ClaimedTerritory { handle, clan, point } => {
                let session = self.lookup(handle, kind)?;
                let args = vec![session.into(), clan.into(), point.into()];
                (call(hooks::ON_PLAYER_CLAIMED_TERRITORY, args), false)
            }
            GameplayEvent::Input { handle, input } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::ON_PLAYER_INPUT, vec![session.into(), input.into()]), false)
            }
            GameplayEvent::Suicide { handle } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::ON_PLAYER_SUICIDE, vec![session.into()]), true)
            }
            GameplayEvent::Voice { handle } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::ON_PLAYER_VOICE, vec![session.into()]), true)
            }
            GameplayEvent::EntityEffect {
                target,
                health,
                amount,
                source,
            } => {
                if !health || source.is_null() {
                    return None;
                }
                let damage = amount >= 0.0;
                match target {
                    EffectTarget::Creature(entity) => {
                        let name = if damage {
                            hooks::ON_ENTITY_TAKE_DAMAGE
                        } else {
                            hooks::ON_ENTITY_HEAL
                        };
                        (call(name, vec![entity.into(), source.into()]), false)
                    }
                    EffectTarget::Player(handle) => {
                        let session = self.lookup(handle, kind)?;
                        let name = if damage {
                            hooks::ON_PLAYER_TAKE_DAMAGE
                        } else {
                            hooks::ON_PLAYER_HEAL
                        };
                        (call(name, vec![session.into(), source.into()]), false)
                    }
                    EffectTarget::Other => return None,
                }
            }
            GameplayEvent::DoorUsed {
                kind: door_kind,
                door,
                last_user,
            } => {
                let session = self.lookup(last_user?, kind)?;
                let name = match door_kind {
                    DoorKind::Single => hooks::ON_SINGLE_DOOR_USED,
                    DoorKind::Double => hooks::ON_DOUBLE_DOOR_USED,
                    DoorKind::Garage => hooks::ON_GARAGE_DOOR_USED,
                };
                (call(name, vec![door.into(), session.into()]), false)
            }
            GameplayEvent::CanEnterVehicle { handle, vehicle } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::CAN_ENTER_VEHICLE, vec![session.into(), vehicle.into()]), true)
            }
            GameplayEvent::CanExitVehicle { handle, vehicle } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::CAN_EXIT_VEHICLE, vec![session.into(), vehicle.into()]), true)
            }
            GameplayEvent::EnteredVehicle { handle, vehicle } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::ON_ENTER_VEHICLE, vec![session.into(), vehicle.into()]), false)
            }
            GameplayEvent::ExitedVehicle { handle, vehicle } => {
                let session = self.lookup(handle, kind)?;
                (call(hooks::ON_EXIT_VEHICLE, vec![session.into(), vehicle.into()]), false)
            }
        };

        let merged = self
            .run(HookInvocation::new(kind).specific(call))
            .await
            .merged();
        Some(if returns { merged } else { HookResult::NoOpinion })
    }
}

fn call(name: &str, args: Vec<HookArg>) -> HookCall {
    HookCall::new(name, args)
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("sessions", &self.directory.len())
            .field("registry", &self.registry)
            .field("branch", &self.engine.branch())
            .field("settings", &self.settings)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`HookDispatcher`].
///
/// Every collaborator except the engine has an in-process default.
pub struct HookDispatcherBuilder {
    engine: Arc<dyn Engine>,
    directory: Option<Arc<SessionDirectory>>,
    players: Option<Arc<PlayerManager>>,
    identities: Option<Arc<dyn IdentityRegistry>>,
    registry: Option<Arc<HookRegistry>>,
    router: Option<Arc<CommandRouter>>,
    clock: Option<Arc<dyn Clock>>,
    settings: DispatchSettings,
}

impl HookDispatcherBuilder {
    /// Uses a shared session directory.
    pub fn directory(mut self, directory: Arc<SessionDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Uses a shared player manager.
    pub fn players(mut self, players: Arc<PlayerManager>) -> Self {
        self.players = Some(players);
        self
    }

    /// Uses an external identity registry.
    pub fn identities(mut self, identities: Arc<dyn IdentityRegistry>) -> Self {
        self.identities = Some(identities);
        self
    }

    /// Uses a shared hook registry.
    pub fn registry(mut self, registry: Arc<HookRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses a shared command router.
    pub fn router(mut self, router: Arc<CommandRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Uses a custom clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the settings.
    pub fn settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> HookDispatcher {
        HookDispatcher {
            directory: self.directory.unwrap_or_default(),
            players: self.players.unwrap_or_default(),
            identities: self
                .identities
                .unwrap_or_else(|| Arc::new(MemoryIdentityRegistry::new())),
            registry: self.registry.unwrap_or_default(),
            router: self.router.unwrap_or_default(),
            engine: self.engine,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            aliases: LegacyAliases::new(self.settings.warn_deprecated),
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandCall, TableKind};
    use crate::hooks::legacy_alias_sunset;
    use chrono::Duration;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tether_core::{FixedClock, PlayerId};

    #[derive(Default)]
    struct RecordingEngine {
        disconnects: Mutex<Vec<(ConnectionHandle, String)>>,
    }

    impl Engine for RecordingEngine {
        fn branch(&self) -> &str {
            "public"
        }

        fn schedule_disconnect(&self, handle: ConnectionHandle, reason: &str) {
            self.disconnects.lock().push((handle, reason.to_string()));
        }

        fn send_message(&self, _handle: ConnectionHandle, _message: &str) {}

        fn broadcast(&self, _prefix: Option<&str>, _message: &str) {}
    }

    struct Harness {
        dispatcher: HookDispatcher,
        engine: Arc<RecordingEngine>,
        identities: Arc<MemoryIdentityRegistry>,
        clock: Arc<FixedClock>,
    }

    fn harness() -> Harness {
        let engine = Arc::new(RecordingEngine::default());
        let identities = Arc::new(MemoryIdentityRegistry::new());
        let clock = Arc::new(FixedClock::new(legacy_alias_sunset() + Duration::days(1)));
        let dispatcher = HookDispatcher::builder(engine.clone())
            .identities(identities.clone())
            .clock(clock.clone())
            .build();
        Harness {
            dispatcher,
            engine,
            identities,
            clock,
        }
    }

    fn session(handle: u64, id: u64) -> Session {
        Session::builder(ConnectionHandle(handle), PlayerId(id))
            .name(Some("Alice"))
            .address("10.0.0.5")
            .language(Some("en"))
            .build()
    }

    fn counter(h: &Harness, hook: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        h.dispatcher.registry().subscribe("counter", hook, move |_call: HookCall| {
            c.fetch_add(1, Ordering::SeqCst);
            async {}
        });
        count
    }

    async fn approve_and_load(h: &Harness, handle: u64, id: u64) {
        let decision = h.dispatcher.on_player_approve(session(handle, id)).await.unwrap();
        assert!(!decision.is_rejected());
        assert!(h.dispatcher.on_player_connected(ConnectionHandle(handle)).await);
    }

    #[tokio::test]
    async fn test_specific_rejection_cleans_directory() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("bans", hooks::CAN_CLIENT_LOGIN, |_call: HookCall| async {
                "Banned"
            });
        h.dispatcher
            .registry()
            .subscribe("vip", hooks::CAN_PLAYER_LOGIN, |_call: HookCall| async { true });

        let decision = h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        assert_eq!(
            decision,
            ApprovalDecision::Rejected {
                reason: "Banned".into()
            }
        );
        assert!(h.dispatcher.directory().find_by_handle(ConnectionHandle(1)).is_none());
        assert!(h.dispatcher.directory().find_by_persistent_id(PlayerId(100)).is_none());
        assert_eq!(
            *h.engine.disconnects.lock(),
            vec![(ConnectionHandle(1), "Banned".to_string())]
        );
    }

    #[tokio::test]
    async fn test_false_rejection_uses_generic_reason() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("whitelist", hooks::CAN_PLAYER_LOGIN, |call: HookCall| async move {
                call.str(1) == Some("42")
            });

        let decision = h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();
        assert_eq!(
            decision,
            ApprovalDecision::Rejected {
                reason: "Connection was rejected".into()
            }
        );
        assert!(h.dispatcher.directory().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_removes_already_registered_session() {
        let h = harness();
        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();
        assert_eq!(h.dispatcher.directory().len(), 1);

        h.dispatcher
            .registry()
            .subscribe("bans", hooks::CAN_CLIENT_LOGIN, |_call: HookCall| async { false });
        let decision = h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        assert!(decision.is_rejected());
        assert!(h.dispatcher.directory().is_empty());
    }

    #[tokio::test]
    async fn test_accept_runs_post_approval_tiers() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("motd", hooks::ON_PLAYER_APPROVED, |call: HookCall| async move {
                assert_eq!(call.str(0), Some("Alice"));
                assert_eq!(call.str(2), Some("10.0.0.5"));
                json!({"slot": 2})
            });

        let decision = h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        assert_eq!(
            decision,
            ApprovalDecision::Approved(HookResult::approve_with(json!({"slot": 2})))
        );
        let stored = h.dispatcher.directory().find_by_handle(ConnectionHandle(1)).unwrap();
        assert_eq!(stored.id(), PlayerId(100));
        assert!(!stored.is_loaded());
    }

    #[tokio::test]
    async fn test_reapproval_replaces_stale_identity() {
        let h = harness();
        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();
        h.dispatcher.on_player_approve(session(2, 100)).await.unwrap();

        assert!(h.dispatcher.directory().find_by_handle(ConnectionHandle(1)).is_none());
        assert_eq!(
            h.dispatcher
                .directory()
                .find_by_persistent_id(PlayerId(100))
                .unwrap()
                .handle(),
            ConnectionHandle(2)
        );
    }

    #[tokio::test]
    async fn test_connect_applies_default_group_once() {
        let h = harness();
        let connected = counter(&h, hooks::ON_PLAYER_CONNECTED);
        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        assert!(h.dispatcher.on_player_connected(ConnectionHandle(1)).await);
        assert!(!h.dispatcher.on_player_connected(ConnectionHandle(1)).await);

        let record = h.identities.record(PlayerId(100)).unwrap();
        assert_eq!(record.groups.len(), 1);
        assert!(record.groups.contains("default"));
        assert_eq!(record.nickname.as_deref(), Some("Alice"));
        assert_eq!(record.language.as_deref(), Some("en"));
        assert_eq!(connected.load(Ordering::SeqCst), 1);

        let stored = h.dispatcher.directory().find_by_handle(ConnectionHandle(1)).unwrap();
        assert!(stored.is_loaded());
        assert_eq!(stored.player().unwrap().name(), "Alice");
    }

    #[tokio::test]
    async fn test_admin_gets_admin_group() {
        let h = harness();
        let admin = Session::builder(ConnectionHandle(5), PlayerId(500))
            .name(Some("Root"))
            .admin(true)
            .build();
        h.dispatcher.on_player_approve(admin).await.unwrap();
        h.dispatcher.on_player_connected(ConnectionHandle(5)).await;

        assert!(h.identities.user_has_group(PlayerId(500), "admin"));
        assert!(h.identities.user_has_group(PlayerId(500), "default"));
    }

    #[tokio::test]
    async fn test_disconnect_before_load_fires_nothing() {
        let h = harness();
        let specific = counter(&h, hooks::ON_PLAYER_DISCONNECTED);
        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        let fired = h.dispatcher.on_player_disconnected(ConnectionHandle(1), None).await;

        assert!(!fired);
        assert_eq!(specific.load(Ordering::SeqCst), 0);
        assert!(h.dispatcher.directory().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_after_load_fires_both_tiers() {
        let h = harness();
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&reasons);
        h.dispatcher.registry().subscribe(
            "log",
            hooks::ON_PLAYER_DISCONNECTED,
            move |call: HookCall| {
                seen.lock().push(call.str(1).map(str::to_string));
                async {}
            },
        );
        approve_and_load(&h, 1, 100).await;

        assert!(h.dispatcher.on_player_disconnected(ConnectionHandle(1), None).await);

        assert_eq!(*reasons.lock(), vec![None, Some("Unknown".to_string())]);
        assert!(h.dispatcher.directory().is_empty());
        assert!(!h.dispatcher.players().find_by_id(PlayerId(100)).unwrap().is_connected());
    }

    #[tokio::test]
    async fn test_late_event_for_stale_handle_is_dropped() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("bans", hooks::CAN_CLIENT_LOGIN, |_call: HookCall| async { "Banned" });
        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        let response = h
            .dispatcher
            .dispatch(EngineEvent::Chat {
                handle: ConnectionHandle(1),
                message: "hi".into(),
            })
            .await
            .unwrap();
        assert_eq!(response, EventResponse::Dropped);
        assert_eq!(response.to_value(), Value::Null);
    }

    #[tokio::test]
    async fn test_chat_universal_tier_runs_before_load() {
        let h = harness();
        let universal_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&universal_hits);
        h.dispatcher
            .registry()
            .subscribe("chat", hooks::ON_PLAYER_CHAT, move |call: HookCall| {
                if call.player().is_some() {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
                async { None::<bool> }
            });
        h.clock.set(legacy_alias_sunset() - Duration::days(1));
        let alias = counter(&h, hooks::ON_USER_CHAT);

        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();
        h.dispatcher.on_player_chat(ConnectionHandle(1), "early").await;
        assert_eq!(universal_hits.load(Ordering::SeqCst), 1);
        assert_eq!(alias.load(Ordering::SeqCst), 1);

        h.dispatcher.on_player_connected(ConnectionHandle(1)).await;
        h.dispatcher.on_player_chat(ConnectionHandle(1), "later").await;
        assert_eq!(universal_hits.load(Ordering::SeqCst), 2);
        assert_eq!(alias.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chat_specific_precedence() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("filter", hooks::ON_PLAYER_CHAT, |call: HookCall| async move {
                if call.session().is_some() {
                    HookResult::reject("Muted")
                } else {
                    HookResult::approve()
                }
            });
        approve_and_load(&h, 1, 100).await;

        assert_eq!(
            h.dispatcher.on_player_chat(ConnectionHandle(1), "hi").await,
            Some(HookResult::reject("Muted"))
        );
    }

    #[tokio::test]
    async fn test_deprecated_alias_respects_clock() {
        let h = harness();
        let alias = counter(&h, hooks::ON_USER_CHAT);
        approve_and_load(&h, 1, 100).await;

        h.dispatcher.on_player_chat(ConnectionHandle(1), "after").await;
        assert_eq!(alias.load(Ordering::SeqCst), 0);

        h.clock.set(legacy_alias_sunset() - Duration::seconds(1));
        h.dispatcher.on_player_chat(ConnectionHandle(1), "before").await;
        assert_eq!(alias.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_command_blocked_by_hook() {
        let h = harness();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        h.dispatcher
            .router()
            .universal()
            .register("kits", "kit", move |_call: CommandCall| {
                r.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .unwrap();
        h.dispatcher
            .registry()
            .subscribe("jail", hooks::ON_PLAYER_COMMAND, |call: HookCall| async move {
                (call.str(1) == Some("kit")).then_some(false)
            });
        approve_and_load(&h, 1, 100).await;

        let outcome = h
            .dispatcher
            .on_player_command(ConnectionHandle(1), "/kit starter")
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Blocked(HookResult::deny()));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_universal_command_block_before_load() {
        let h = harness();
        h.dispatcher
            .router()
            .universal()
            .register("kits", "kit", |_call: CommandCall| async {})
            .unwrap();
        h.dispatcher
            .registry()
            .subscribe("jail", hooks::ON_PLAYER_COMMAND, |call: HookCall| async move {
                call.player().is_some().then_some(false)
            });
        h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();

        let outcome = h
            .dispatcher
            .on_player_command(ConnectionHandle(1), "/kit")
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Blocked(HookResult::deny()));
    }

    #[tokio::test]
    async fn test_command_routed() {
        let h = harness();
        h.dispatcher
            .router()
            .legacy()
            .register("homes", "home", |call: CommandCall| async move {
                assert_eq!(call.args(), ["base"]);
            })
            .unwrap();
        approve_and_load(&h, 1, 100).await;

        let response = h
            .dispatcher
            .dispatch(EngineEvent::Command {
                handle: ConnectionHandle(1),
                line: "/home base".into(),
            })
            .await
            .unwrap();

        match &response {
            EventResponse::Command(CommandOutcome::Routed(outcome)) => {
                assert!(matches!(
                    outcome,
                    RouteOutcome::Handled {
                        table: TableKind::Legacy,
                        ..
                    }
                ));
            }
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(response.to_value(), json!(true));
    }

    #[tokio::test]
    async fn test_empty_command_is_not_a_command() {
        let h = harness();
        approve_and_load(&h, 1, 100).await;
        assert_eq!(
            h.dispatcher.on_player_command(ConnectionHandle(1), "/").await,
            Some(CommandOutcome::NotCommand)
        );
    }

    #[tokio::test]
    async fn test_entity_effect_split_by_sign() {
        let h = harness();
        let damage = counter(&h, hooks::ON_ENTITY_TAKE_DAMAGE);
        let heal = counter(&h, hooks::ON_PLAYER_HEAL);
        approve_and_load(&h, 1, 100).await;

        let creature = GameplayEvent::EntityEffect {
            target: EffectTarget::Creature(json!({"kind": "wolf"})),
            health: true,
            amount: 12.0,
            source: json!({"kind": "fall"}),
        };
        let player_heal = GameplayEvent::EntityEffect {
            target: EffectTarget::Player(ConnectionHandle(1)),
            health: true,
            amount: -5.0,
            source: json!({"kind": "fall"}),
        };
        let stamina = GameplayEvent::EntityEffect {
            target: EffectTarget::Player(ConnectionHandle(1)),
            health: false,
            amount: -5.0,
            source: json!({"kind": "fall"}),
        };

        assert_eq!(h.dispatcher.on_gameplay(creature).await, Some(HookResult::NoOpinion));
        assert_eq!(h.dispatcher.on_gameplay(player_heal).await, Some(HookResult::NoOpinion));
        assert_eq!(h.dispatcher.on_gameplay(stamina).await, None);
        assert_eq!(damage.load(Ordering::SeqCst), 1);
        assert_eq!(heal.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entity_effect_without_source_is_dropped() {
        let h = harness();
        let damage = counter(&h, hooks::ON_PLAYER_TAKE_DAMAGE);
        approve_and_load(&h, 1, 100).await;

        let sourceless = GameplayEvent::EntityEffect {
            target: EffectTarget::Player(ConnectionHandle(1)),
            health: true,
            amount: 20.0,
            source: Value::Null,
        };
        assert_eq!(h.dispatcher.on_gameplay(sourceless).await, None);
        assert_eq!(damage.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_returning_gameplay_hooks() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("nocraft", hooks::CAN_CRAFT, |_call: HookCall| async { false });
        approve_and_load(&h, 1, 100).await;

        let craft = GameplayEvent::Craft {
            handle: ConnectionHandle(1),
            recipe: json!("spear"),
        };
        assert_eq!(h.dispatcher.on_gameplay(craft).await, Some(HookResult::deny()));

        let unknown = GameplayEvent::Suicide {
            handle: ConnectionHandle(9),
        };
        assert_eq!(h.dispatcher.on_gameplay(unknown).await, None);
    }

    #[tokio::test]
    async fn test_door_without_last_user_is_dropped() {
        let h = harness();
        let used = counter(&h, hooks::ON_GARAGE_DOOR_USED);
        approve_and_load(&h, 1, 100).await;

        let orphan = GameplayEvent::DoorUsed {
            kind: DoorKind::Garage,
            door: json!({}),
            last_user: None,
        };
        let used_door = GameplayEvent::DoorUsed {
            kind: DoorKind::Garage,
            door: json!({}),
            last_user: Some(ConnectionHandle(1)),
        };
        assert_eq!(h.dispatcher.on_gameplay(orphan).await, None);
        assert!(h.dispatcher.on_gameplay(used_door).await.is_some());
        assert_eq!(used.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unload_plugin() {
        let h = harness();
        h.dispatcher
            .registry()
            .subscribe("bans", hooks::CAN_CLIENT_LOGIN, |_call: HookCall| async { "Banned" });
        h.dispatcher.unload_plugin("bans");

        let decision = h.dispatcher.on_player_approve(session(1, 100)).await.unwrap();
        assert!(!decision.is_rejected());
    }
}
