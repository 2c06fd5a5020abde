use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::steam::STEAM_APP_ID;

const CONFIG_FILE: &str = "config.json";

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV: &str = "HOLLOW_PRESENCE_CONFIG";

/// Directory name used under the platform config and data directories
pub const APP_DIR: &str = "hollow-presence";

/// Placeholder application id, replace with the id of your Discord application
const DEFAULT_DISCORD_APP_ID: i64 = 1_000_000_000_000_000_000;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord_app_id: i64,
    pub steam_app_id: u32,
    pub poll_interval_secs: u64,
    /// JSON file the in-game bridge writes the game state to
    pub state_file: PathBuf,
    pub large_image_key: String,
    pub large_image_text: String,
    pub enable_discord: bool,
    pub enable_steam: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_app_id: DEFAULT_DISCORD_APP_ID,
            steam_app_id: STEAM_APP_ID,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            state_file: data_dir().join("state.json"),
            large_image_key: "hollowknight".to_string(),
            large_image_text: "Hollow Knight".to_string(),
            enable_discord: true,
            enable_steam: true,
        }
    }
}

impl Config {
    /// Polling period, never shorter than one second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Base directory for runtime data (logs, bridge state)
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn get_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Load the config from its default location
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(get_config_path())
}

/// Load the config from `path`, falling back to defaults when it does not exist
pub fn load_config_from(path: PathBuf) -> Result<Config, ConfigError> {
    tracing::debug!("Loading config from {}", path.display());

    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
