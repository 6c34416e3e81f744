//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use tether_framework::{CommandSettings, DispatchSettings};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TetherConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Chat command parsing.
    #[serde(default)]
    pub commands: CommandSettings,

    /// Permission groups applied on connect.
    #[serde(default)]
    pub groups: GroupConfig,

    /// Player-facing texts.
    #[serde(default)]
    pub players: PlayerConfig,

    /// Hook behaviour.
    #[serde(default)]
    pub hooks: HookConfig,

    /// Engine selection.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Event loop settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl TetherConfig {
    /// Settings for the hook dispatcher.
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            players_group: self.groups.players.clone(),
            admin_group: self.groups.administrators.clone(),
            disconnect_reason: self.players.disconnect_reason.clone(),
            rejection_reason: self.players.rejection_reason.clone(),
            warn_deprecated: self.hooks.warn_deprecated,
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with all fields.
    Full,
    /// Multi-line, human oriented.
    Pretty,
    /// Newline-delimited JSON. Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A file, see [`LoggingConfig::file_path`].
    File,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// One file, never rotated.
    #[default]
    Never,
    /// A new file every hour.
    Hourly,
    /// A new file every day.
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    /// Span creation.
    pub new: bool,
    /// Span entry.
    pub enter: bool,
    /// Span exit.
    pub exit: bool,
    /// Span close.
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Output destination.
    pub output: LogOutput,
    /// Log file for [`LogOutput::File`].
    pub file_path: Option<PathBuf>,
    /// Rotation period for file output.
    pub rotation: LogRotation,
    /// Rotated files to keep; 0 keeps all.
    pub max_files: usize,
    /// Per-target levels, e.g. `tether_framework = "debug"`.
    pub filters: HashMap<String, String>,
    /// Span lifecycle events.
    pub span_events: SpanEventConfig,
    /// Include thread ids.
    pub thread_ids: bool,
    /// Include source file and line.
    pub file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            max_files: 5,
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
        }
    }
}

// =============================================================================
// Bridge
// =============================================================================

/// Permission groups applied on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Group for every player.
    pub players: String,
    /// Group for administrators.
    pub administrators: String,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            players: "default".into(),
            administrators: "admin".into(),
        }
    }
}

/// Player-facing texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Disconnect reason passed to universal hooks when the engine has none.
    pub disconnect_reason: String,
    /// Disconnect reason for rejections without one.
    pub rejection_reason: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            disconnect_reason: "Unknown".into(),
            rejection_reason: "Connection was rejected".into(),
        }
    }
}

/// Hook behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Warn plugins subscribed to deprecated aliases.
    pub warn_deprecated: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            warn_deprecated: true,
        }
    }
}

/// Known engine API branches.
pub const ENGINE_BRANCHES: [&str; 2] = ["public", "itemv2"];

/// Engine selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// API branch: `public` (legacy) or `itemv2`.
    pub branch: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            branch: "public".into(),
        }
    }
}

/// Event loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Events that may wait in the queue before submitters block.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}
