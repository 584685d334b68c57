use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::schema::WeblibConfig;

pub const CONFIG_FILE_NAMES: &[&str] = &["weblib.toml", "weblib.yaml", "weblib.yml", "weblib.json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Parse a config file, picking the format from its extension.
pub fn load_config(path: &Path) -> Result<WeblibConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

fn parse_config(raw: &str, path: &Path) -> Result<WeblibConfig, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        Some("yaml" | "yml") => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        Some("json") => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Platform config directory (e.g. `~/.config/weblib`).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "weblib", "weblib").map(|d| d.config_dir().to_path_buf())
}

/// First existing config file in `dirs`, checked in order.
#[must_use]
pub fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Load from `explicit`, or discover a file in the working directory and then
/// the platform config dir. Environment overrides are applied last.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<WeblibConfig, ConfigError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let mut dirs = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                dirs.push(cwd);
            }
            if let Some(dir) = config_dir() {
                dirs.push(dir);
            }
            find_config_file(&dirs)
        },
    };

    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            WeblibConfig::default()
        },
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply `WEBLIB_*` overrides, reading variables through `lookup`.
pub fn apply_env_overrides(
    config: &mut WeblibConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("WEBLIB_CLIENT_ID") {
        config.identity.client_id = v;
    }
    if let Some(v) = lookup("WEBLIB_BACKEND_URL") {
        config.backend.base_url = v;
    }
    if let Some(v) = lookup("WEBLIB_REDIRECT_URI") {
        config.identity.redirect_uri = Some(v);
    }
    if let Some(v) = lookup("WEBLIB_CALLBACK_BIND") {
        config.callback.bind = Some(v);
    }
    if let Some(v) = lookup("WEBLIB_LOGIN_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(secs) if secs > 0 => config.identity.login_timeout_secs = secs,
            _ => {
                warn!(value = %v, "invalid login timeout override");
                return Err(ConfigError::InvalidEnv {
                    key: "WEBLIB_LOGIN_TIMEOUT_SECS",
                    value: v,
                });
            },
        }
    }
    Ok(())
}
