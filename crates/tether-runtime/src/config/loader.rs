//! Layered configuration loading.
//!
//! Sources, later ones winning:
//!
//! 1. [`TetherConfig::default`] and anything passed to [`ConfigLoader::merge`]
//! 2. `tether.<profile>.<ext>` next to the main file, when a profile is set
//! 3. the main file: `tether.<ext>` or `config.<ext>`, first directory that has one
//! 4. `TETHER_*` variables, nested with `__` (`TETHER_ENGINE__BRANCH=itemv2`)
//!
//! TOML files need the `toml-config` feature (default), YAML files need
//! `yaml-config`. Directories default to the working directory, then the
//! user config directory's `tether/`.

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::TetherConfig;
use super::validation::validate_config;

/// Environment variable naming the deployment profile.
pub const PROFILE_ENV: &str = "TETHER_PROFILE";

const ENV_PREFIX: &str = "TETHER_";
const BASE_NAMES: [&str; 2] = ["tether", "config"];

/// File extensions enabled by features, in search order.
#[allow(unused_mut)]
fn extensions() -> Vec<&'static str> {
    let mut exts = Vec::new();
    #[cfg(feature = "toml-config")]
    exts.push("toml");
    #[cfg(feature = "yaml-config")]
    exts.extend(["yaml", "yml"]);
    exts
}

/// The deployment profile from [`PROFILE_ENV`], lowercased.
pub fn profile_from_env() -> Option<String> {
    std::env::var(PROFILE_ENV)
        .ok()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
}

/// Builds a [`TetherConfig`] from files, environment and code.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Option<String>,
    dirs: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader with the profile taken from the environment.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: profile_from_env(),
            dirs: Vec::new(),
            file: None,
            env: true,
        }
    }

    /// Sets the deployment profile, e.g. `production`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into().to_lowercase());
        self
    }

    /// Adds a directory to search. Replaces the default directories.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `TETHER_*` variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers `config` over the defaults, below any file.
    pub fn merge(mut self, config: TetherConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Extracts the configuration. Does not validate it.
    pub fn load(self) -> ConfigResult<TetherConfig> {
        let mut figment = Figment::from(Serialized::defaults(TetherConfig::default()))
            .merge(self.overrides.clone());

        match &self.file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => {
                if let Some(profiled) = self.profiled(path).filter(|p| p.exists()) {
                    figment = merge_file(figment, &profiled)?;
                }
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, path)?;
            }
            None => match self.find_main_file() {
                Some(path) => {
                    if let Some(profiled) = self.profiled(&path).filter(|p| p.exists()) {
                        debug!(path = %profiled.display(), "Loading profile configuration");
                        figment = merge_file(figment, &profiled)?;
                    }
                    info!(path = %path.display(), "Loading configuration file");
                    figment = merge_file(figment, &path)?;
                }
                None => warn!("No configuration file found, using defaults"),
            },
        }

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: TetherConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!(
            profile = self.profile.as_deref().unwrap_or("-"),
            branch = %config.engine.branch,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.dirs.is_empty() {
            return self.dirs.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|d| d.join("tether")))
            .collect()
    }

    fn find_main_file(&self) -> Option<PathBuf> {
        let exts = extensions();
        self.search_dirs().into_iter().find_map(|dir| {
            BASE_NAMES.iter().find_map(|base| {
                exts.iter()
                    .map(|ext| dir.join(format!("{base}.{ext}")))
                    .find(|path| path.exists())
            })
        })
    }

    /// `dir/stem.<profile>.ext` for a main file `dir/stem.ext`.
    fn profiled(&self, main: &Path) -> Option<PathBuf> {
        let profile = self.profile.as_deref()?;
        let stem = main.file_stem()?.to_str()?;
        let ext = main.extension()?.to_str()?;
        Some(main.with_file_name(format!("{stem}.{profile}.{ext}")))
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or_default() {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        ext => Err(ConfigError::ParseError(format!(
            "unsupported configuration format: .{ext}"
        ))),
    }
}

/// Loads configuration from the default locations and validates it.
pub fn load_config() -> ConfigResult<TetherConfig> {
    let config = ConfigLoader::new().load()?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads configuration from `path` (plus `TETHER_*` overrides) and validates it.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<TetherConfig> {
    let config = ConfigLoader::new().file(path).load()?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config, TetherConfig::default());
            assert_eq!(config.logging.level, "info");
            assert_eq!(config.commands.prefix, '/');
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tether.toml",
                r#"
                [logging]
                level = "warn"
                format = "pretty"

                [commands]
                prefix = "!"
                quote_aware = true

                [groups]
                players = "player"

                [engine]
                branch = "itemv2"
                "#,
            )?;
            jail.set_env("TETHER_LOGGING__LEVEL", "debug");
            jail.set_env("TETHER_PLAYERS__REJECTION_REASON", "Server is full");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, LogFormat::Pretty);
            assert_eq!(config.commands.prefix, '!');
            assert!(config.commands.quote_aware);
            assert_eq!(config.groups.players, "player");
            assert_eq!(config.groups.administrators, "admin");
            assert_eq!(config.players.rejection_reason, "Server is full");
            assert_eq!(config.engine.branch, "itemv2");
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_is_overridden_by_base() {
        Jail::expect_with(|jail| {
            jail.create_file("tether.production.toml", "[hooks]\nwarn_deprecated = false\n[logging]\nlevel = \"error\"")?;
            jail.create_file("tether.toml", "[logging]\nlevel = \"warn\"")?;

            let config = ConfigLoader::new()
                .profile("production")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert!(!config.hooks.warn_deprecated);
            assert_eq!(config.logging.level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/tether.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[engine]\nbranch = \"staging\"")?;
            let result = load_config_from_file(jail.directory().join("bad.toml"));
            assert!(matches!(result, Err(ConfigError::InvalidBranch(_))));
            Ok(())
        });
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("TETHER_PROFILE", " Staging ");
            assert_eq!(profile_from_env().as_deref(), Some("staging"));

            jail.create_file("config.toml", "[groups]\nplayers = \"guest\"")?;
            jail.create_file("config.staging.toml", "[groups]\nadministrators = \"ops\"")?;
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.groups.players, "guest");
            assert_eq!(config.groups.administrators, "ops");
            Ok(())
        });
    }
}
