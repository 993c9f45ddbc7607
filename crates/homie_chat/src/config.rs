//! Client config load/save for `~/.homie-chat/config.yaml`.
//! Sections: server.*, auth.*, chat.*.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::connection::DEFAULT_RECONNECT_DELAY;
use crate::presence::DEFAULT_ASSISTANT_NAME;
use crate::session::SessionOptions;

/// Server section (base_url of the REST + live API).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Auth section (bearer token issued elsewhere).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AuthSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Chat section (channel, reconnect delay, assistant name, history toggle).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ChatSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<bool>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub chat: ChatSection,
}

impl Config {
    pub fn reconnect_delay(&self) -> Duration {
        self.chat
            .reconnect_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RECONNECT_DELAY)
    }

    pub fn assistant_name(&self) -> &str {
        self.chat
            .assistant_name
            .as_deref()
            .unwrap_or(DEFAULT_ASSISTANT_NAME)
    }

    pub fn history_enabled(&self) -> bool {
        self.chat.history.unwrap_or(true)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .server
            .base_url
            .as_deref()
            .ok_or(ConfigError::Missing("server.base_url"))?;
        Url::parse(raw).map_err(|e| ConfigError::Parse(format!("server.base_url: {}", e)))
    }

    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        Ok(SessionOptions::new(self.base_url()?)
            .with_reconnect_delay(self.reconnect_delay())
            .with_assistant_name(self.assistant_name()))
    }
}

/// Returns the default config file path: `~/.homie-chat/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".homie-chat").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config).map_err(|e| ConfigError::Parse(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Config load/save error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("missing {0}")]
    Missing(&'static str),
}
