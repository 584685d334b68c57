//! Configuration loading for weblib.
//!
//! A config file is optional. When present it may be TOML, YAML or JSON; any
//! section or key left out falls back to the values the hosted deployment uses.
//! `WEBLIB_*` environment variables override the file.

pub mod loader;
pub mod schema;

pub use {
    loader::{ConfigError, apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{BackendConfig, CallbackConfig, IdentityConfig, WeblibConfig},
};
