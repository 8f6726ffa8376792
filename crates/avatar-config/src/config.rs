//! Configuration types and loading.
//!
//! The main entry point is [`AvatarConfig`], loaded with [`load_config`].
//! Keys are kebab-case in files (`propagation.max-passes`); the matching
//! environment variable uses `__` between sections and `_` within a key
//! (`AVATAR_PROPAGATION__MAX_PASSES`).

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Prefix of environment variables read by [`load_config`].
pub const ENV_PREFIX: &str = "AVATAR_";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or a value did not deserialize.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// The config file extension is neither YAML nor TOML.
    #[error("unsupported config file format: {} (expected .yaml, .yml or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A configuration value was out of range.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// When to colorize terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when writing to a terminal that allows it.
    #[default]
    Auto,
    Always,
    Never,
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `"avatar_core=debug"`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

/// Propagation configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PropagationConfig {
    /// Abort propagation after this many passes. Unset means no limit.
    #[serde(default, rename = "max-passes", skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<usize>,
}

/// Output configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Print JSON instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub color: ColorMode,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full avatar configuration.
///
/// Every section has defaults, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AvatarConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub propagation: PropagationConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl AvatarConfig {
    /// Rejects values that deserialize but make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.propagation.max_passes == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "propagation.max-passes".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "log.filter".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Builds the layered [`Figment`] without extracting it.
///
/// A missing file contributes nothing.
pub fn figment(path: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(AvatarConfig::default()));

    if let Some(path) = path {
        figment = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("toml") => figment.merge(Toml::file(path)),
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
    }

    let env = Env::prefixed(ENV_PREFIX)
        .split("__")
        .map(|key| key.as_str().replace('_', "-").into());
    Ok(figment.merge(env))
}

/// Loads configuration from defaults, `path` (if given) and the environment.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedFormat`] for an unknown file extension,
/// [`ConfigError::Figment`] if a layer fails to parse, or
/// [`ConfigError::InvalidValue`] if a value is out of range.
pub fn load_config(path: Option<&Path>) -> Result<AvatarConfig> {
    let config: AvatarConfig = figment(path)?.extract()?;
    config.validate()?;
    debug!(
        path = ?path,
        max_passes = ?config.propagation.max_passes,
        "loaded configuration"
    );
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
