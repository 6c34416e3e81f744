//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ENGINE_BRANCHES, GroupConfig, LoggingConfig, TetherConfig};
use tether_framework::CommandSettings;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &TetherConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_commands(&config.commands)?;
    validate_groups(&config.groups)?;

    if !ENGINE_BRANCHES.contains(&config.engine.branch.as_str()) {
        return Err(ConfigError::InvalidBranch(config.engine.branch.clone()));
    }
    if config.runtime.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "Event queue capacity must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_level(level: &str) -> ConfigResult<()> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLogLevel(level.to_string()))
    }
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level(&logging.level)?;
    for (target, level) in &logging.filters {
        if target.trim().is_empty() {
            return Err(ConfigError::validation("Log filter target cannot be empty"));
        }
        validate_level(level)?;
    }
    Ok(())
}

fn validate_commands(commands: &CommandSettings) -> ConfigResult<()> {
    let prefix = commands.prefix;
    if prefix.is_whitespace() || prefix.is_alphanumeric() {
        return Err(ConfigError::InvalidPrefix(prefix));
    }
    Ok(())
}

fn validate_groups(groups: &GroupConfig) -> ConfigResult<()> {
    if groups.players.trim().is_empty() {
        return Err(ConfigError::validation("Players group name cannot be empty"));
    }
    if groups.administrators.trim().is_empty() {
        return Err(ConfigError::validation(
            "Administrators group name cannot be empty",
        ));
    }
    Ok(())
}
