//! Configuration management for the avatar tools.
//!
//! Settings are layered: built-in defaults, then an optional YAML or TOML
//! file, then `AVATAR_*` environment variables. See [`config::load_config`].

pub mod config;

pub use config::{AvatarConfig, ColorMode, ConfigError, load_config};
