//! Configuration for tcr-analyst: XDG `config.toml`, project `.env`, and process environment.
//!
//! Values are applied to the process environment with priority **existing env > .env > XDG**,
//! so every consumer (output paths, template directory, log settings) reads plain env vars.
//!
//! Keys understood by the workspace:
//!
//! | key                   | used by                                   |
//! |-----------------------|-------------------------------------------|
//! | `TCR_DATA_FILE`       | data-bridge file named in rendered prompts |
//! | `TCR_OUTPUT_FILE`     | CSV file named in rendered prompts         |
//! | `TCR_PROMPTS_DIR`     | directory holding `analysis.yaml`          |
//! | `TCR_DEFAULT_PATTERN` | default glob for batch analysis            |
//! | `RUST_LOG`, `LOG_FILE`| [`init_tracing`] (feature `tracing-init`)  |

mod dotenv;
mod xdg_toml;

#[cfg(feature = "tracing-init")]
mod tracing_init;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(feature = "tracing-init")]
pub use tracing_init::{init_tracing, LogGuard, TracingOptions};

/// Application name used for the XDG directory (`~/.config/tcr-analyst/config.toml`).
pub const APP_NAME: &str = "tcr-analyst";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
    #[error("open log file {path}: {source}")]
    LogFile {
        path: String,
        source: std::io::Error,
    },
    #[error("install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Loads `[env]` from `$XDG_CONFIG_HOME/<app_name>/config.toml` and the project `.env`,
/// then sets each key that is **not** already present in the process environment.
///
/// * `app_name`: normally [`APP_NAME`].
/// * `override_dir`: look for `.env` here instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let mut keys: Vec<&String> = xdg_map.keys().chain(dotenv_map.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }

    Ok(())
}

/// Reads `key` as a path. Unset or blank values return `None`.
pub fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

/// Reads `key` trimmed. Unset or blank values return `None`.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
