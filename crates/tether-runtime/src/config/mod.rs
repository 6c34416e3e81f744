//! Configuration module for the Tether runtime.
//!
//! Layered loading via figment (defaults, files, `TETHER_*` environment
//! variables, programmatic overrides) and validation of the merged result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, PROFILE_ENV, load_config, load_config_from_file, profile_from_env};
pub use schema::{
    EngineConfig, GroupConfig, HookConfig, LogFormat, LogOutput, LogRotation, LoggingConfig,
    PlayerConfig, RuntimeConfig, SpanEventConfig, TetherConfig,
};
pub use validation::validate_config;
