//! Configuration loading and parsing.
//!
//! A local `smelt.toml` wins over the platform config directory. Unknown
//! fields are ignored and a file that fails to parse falls back to
//! defaults, so a broken config never stops the terminal from starting.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct ShellConfig {
    /// Program to run instead of the login shell from the password
    /// database. Absent means: ask `getpwuid`.
    #[serde(default)]
    pub program: Option<String>,
    /// Value exported as `TERM` to the child.
    #[serde(default = "ShellConfig::default_term")]
    pub term: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: None,
            term: Self::default_term(),
        }
    }
}

impl ShellConfig {
    fn default_term() -> String {
        "xterm".to_string()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScreenConfig {
    #[serde(default = "ScreenConfig::default_columns")]
    pub columns: u16,
    #[serde(default = "ScreenConfig::default_rows")]
    pub rows: u16,
    /// Scrollback lines kept above the visible region; 0 = unlimited.
    #[serde(default)]
    pub scrollback_limit: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            columns: Self::default_columns(),
            rows: Self::default_rows(),
            scrollback_limit: 0,
        }
    }
}

impl ScreenConfig {
    const fn default_columns() -> u16 {
        80
    }
    const fn default_rows() -> u16 {
        24
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
}

/// Best-effort config path: working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("smelt.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("smelt").join("smelt.toml");
    }
    PathBuf::from("smelt.toml")
}

/// Load from `path`, or from the discovered location when absent. Missing
/// file and parse errors both yield defaults.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<Config>(&content) {
            Ok(config) => {
                info!(target: "config", path = %path.display(), "config loaded");
                Ok(config)
            }
            Err(err) => {
                warn!(target: "config", path = %path.display(), %err, "config parse error, using defaults");
                Ok(Config::default())
            }
        },
        Err(_) => Ok(Config::default()),
    }
}
