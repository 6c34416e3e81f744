//! Tether Runtime - Orchestration layer for the Tether game event bridge.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`config`)
//! - Logging setup driven by configuration (`logging`)
//! - The sequential event loop (`BridgeRuntime`) and its submitter
//!   (`RuntimeHandle`)
//!
//! ```ignore
//! use tether_runtime::BridgeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BridgeRuntime::builder().build(engine)?;
//!
//!     // Give the handle to the engine adapter
//!     let handle = runtime.handle();
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, TetherConfig, load_config};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, init_from_config};
pub use runtime::{BridgeRuntime, RuntimeBuilder, RuntimeHandle, RuntimeStats};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
