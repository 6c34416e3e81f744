//! Main runtime orchestration.
//!
//! The runtime owns the [`HookDispatcher`] and a single event loop that
//! drains a bounded queue, processing one engine event to completion before
//! taking the next. Engine adapters submit events through a cloneable
//! [`RuntimeHandle`] and receive the dispatcher's response back.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tether_runtime::BridgeRuntime;
//!
//! let runtime = BridgeRuntime::builder()
//!     .config_file("tether.toml")
//!     .build(engine)?;
//!
//! runtime.dispatcher().registry().subscribe("motd", "OnPlayerConnected", on_connected);
//! let handle = runtime.handle();
//!
//! // Hand `handle` to the engine adapter, then run until Ctrl+C
//! runtime.run().await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, TetherConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use tether_core::{Clock, Engine, EngineEvent, EventSource, IdentityRegistry};
use tether_framework::{CommandRouter, EventResponse, HookDispatcher};

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Event loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Events that reached the hook tiers.
    pub processed: u64,
    /// Events dropped for lack of a session, or untranslatable.
    pub dropped: u64,
    /// Events that failed with a directory error.
    pub failed: u64,
}

impl Counters {
    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// RuntimeHandle
// =============================================================================

type Reply = oneshot::Sender<RuntimeResult<EventResponse>>;

struct Envelope {
    event: EngineEvent,
    reply: Option<Reply>,
}

/// Cloneable submitter for engine events.
#[derive(Clone)]
pub struct RuntimeHandle {
    sender: mpsc::Sender<Envelope>,
    shutdown: CancellationToken,
    counters: Arc<Counters>,
}

impl RuntimeHandle {
    /// Submits an event and waits for the dispatcher's response.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime has shut down, or the error the
    /// dispatcher returned for this event.
    pub async fn submit(&self, event: EngineEvent) -> RuntimeResult<EventResponse> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| RuntimeError::Closed)?;
        response.await.map_err(|_| RuntimeError::NoResponse)?
    }

    /// Blocking variant of [`submit`](Self::submit) for engine threads
    /// outside the tokio runtime. Panics if called from within an async
    /// context, like every tokio blocking primitive.
    pub fn blocking_submit(&self, event: EngineEvent) -> RuntimeResult<EventResponse> {
        let (reply, response) = oneshot::channel();
        self.sender
            .blocking_send(Envelope {
                event,
                reply: Some(reply),
            })
            .map_err(|_| RuntimeError::Closed)?;
        response.blocking_recv().map_err(|_| RuntimeError::NoResponse)?
    }

    /// Queues an event without waiting for its response.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime has shut down.
    pub async fn notify(&self, event: EngineEvent) -> RuntimeResult<()> {
        self.sender
            .send(Envelope { event, reply: None })
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    /// Translates a native callback through `source` and submits it.
    ///
    /// Returns the engine-facing value; callbacks the source does not
    /// translate yield `null` without touching the queue.
    pub async fn submit_native<S: EventSource>(
        &self,
        source: &S,
        native: S::Native,
    ) -> RuntimeResult<Value> {
        match source.translate(native) {
            Some(event) => Ok(self.submit(event).await?.to_value()),
            None => Ok(self.untranslated(source)),
        }
    }

    /// Blocking variant of [`submit_native`](Self::submit_native).
    pub fn blocking_submit_native<S: EventSource>(
        &self,
        source: &S,
        native: S::Native,
    ) -> RuntimeResult<Value> {
        match source.translate(native) {
            Some(event) => Ok(self.blocking_submit(event)?.to_value()),
            None => Ok(self.untranslated(source)),
        }
    }

    fn untranslated<S: EventSource>(&self, source: &S) -> Value {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        debug!(branch = source.branch(), "Native callback not translated, dropped");
        Value::Null
    }

    /// Asks the event loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Current counters.
    pub fn stats(&self) -> RuntimeStats {
        self.counters.snapshot()
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("closed", &self.sender.is_closed())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

// =============================================================================
// BridgeRuntime
// =============================================================================

/// The bridge runtime: configuration, dispatcher and event loop.
pub struct BridgeRuntime {
    config: TetherConfig,
    dispatcher: Arc<HookDispatcher>,
    handle: RuntimeHandle,
    receiver: Mutex<Option<mpsc::Receiver<Envelope>>>,
}

impl BridgeRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging from the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn from_config(config: &TetherConfig, engine: Arc<dyn Engine>) -> RuntimeResult<Self> {
        RuntimeBuilder::new().config(config.clone()).build(engine)
    }

    fn assemble(
        config: TetherConfig,
        engine: Arc<dyn Engine>,
        identities: Option<Arc<dyn IdentityRegistry>>,
        clock: Option<Arc<dyn Clock>>,
    ) -> Self {
        if engine.branch() != config.engine.branch {
            warn!(
                configured = %config.engine.branch,
                engine = %engine.branch(),
                "Engine branch differs from configuration, using the engine's"
            );
        }

        let mut builder = HookDispatcher::builder(engine)
            .router(Arc::new(CommandRouter::new(config.commands.clone())))
            .settings(config.dispatch_settings());
        if let Some(identities) = identities {
            builder = builder.identities(identities);
        }
        if let Some(clock) = clock {
            builder = builder.clock(clock);
        }

        let (sender, receiver) = mpsc::channel(config.runtime.queue_capacity);
        let handle = RuntimeHandle {
            sender,
            shutdown: CancellationToken::new(),
            counters: Arc::new(Counters::default()),
        };

        info!(
            branch = %config.engine.branch,
            prefix = %config.commands.prefix,
            queue_capacity = config.runtime.queue_capacity,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            dispatcher: Arc::new(builder.build()),
            handle,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// The dispatcher, for plugin subscriptions and command registration.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// A submitter for engine adapters.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// The token that stops the event loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.handle.shutdown.clone()
    }

    /// Current counters.
    pub fn stats(&self) -> RuntimeStats {
        self.handle.stats()
    }

    /// Runs the event loop until Ctrl+C, SIGTERM or the shutdown token.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Tether runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_signal()).await
    }

    /// Runs the event loop until `shutdown` completes or the shutdown token
    /// is cancelled.
    ///
    /// Events still queued when the loop stops are dropped; their submitters
    /// see [`RuntimeError::NoResponse`].
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AlreadyRunning`] if another call is still running.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyRunning)?;
        let token = self.handle.shutdown.clone();
        tokio::pin!(shutdown);

        info!(branch = %self.dispatcher.engine().branch(), "Event loop started");
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = &mut shutdown => break,
                envelope = receiver.recv() => match envelope {
                    Some(envelope) => self.process(envelope).await,
                    None => break,
                },
            }
        }

        let stats = self.stats();
        info!(
            processed = stats.processed,
            dropped = stats.dropped,
            failed = stats.failed,
            "Event loop stopped"
        );
        *self.receiver.lock() = Some(receiver);
        Ok(())
    }

    async fn process(&self, envelope: Envelope) {
        let counters = &self.handle.counters;
        let result = self
            .dispatcher
            .dispatch(envelope.event)
            .await
            .map_err(RuntimeError::from);

        match &result {
            Ok(EventResponse::Dropped) => counters.dropped.fetch_add(1, Ordering::Relaxed),
            Ok(_) => counters.processed.fetch_add(1, Ordering::Relaxed),
            Err(e) => {
                warn!(error = %e, "Event dispatch failed");
                counters.failed.fetch_add(1, Ordering::Relaxed)
            }
        };

        if let Some(reply) = envelope.reply
            && reply.send(result).is_err()
        {
            debug!("Submitter went away before the response was ready");
        }
    }
}

impl std::fmt::Debug for BridgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C, waiting for the shutdown token");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BridgeRuntime`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = BridgeRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .identities(permissions)
///     .build(engine)?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<TetherConfig>,
    identities: Option<Arc<dyn IdentityRegistry>>,
    clock: Option<Arc<dyn Clock>>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            identities: None,
            clock: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: TetherConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: TetherConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses an external identity registry.
    pub fn identities(mut self, identities: Arc<dyn IdentityRegistry>) -> Self {
        self.identities = Some(identities);
        self
    }

    /// Uses a custom clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn skip_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be loaded or does not validate.
    pub fn build(self, engine: Arc<dyn Engine>) -> RuntimeResult<BridgeRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        Ok(BridgeRuntime::assemble(
            config,
            engine,
            self.identities,
            self.clock,
        ))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
