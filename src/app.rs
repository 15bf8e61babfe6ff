use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::client::{ApiClient, DEFAULT_TIMEOUT};
use crate::api::error::ApiError;
use crate::api::models::CurrentUser;
use crate::auth::AuthSession;
use crate::chat::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available")]
    NoConfigDir,
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config write: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn default_poll_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Persisted client settings and login state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Directory endpoint relative to `/api/`; derived from the role when unset.
    #[serde(default)]
    pub contacts_path: Option<String>,
    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub user: Option<CurrentUser>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            contacts_path: None,
            poll_interval_secs: default_poll_secs(),
            request_timeout_secs: default_timeout_secs(),
            user: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("org", "clinic", "clinic-chat")?;
        Some(proj.config_dir().join("config.toml"))
    }

    /// Loads the state at `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.base_url.is_empty() && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn contacts_path(&self) -> Option<String> {
        self.contacts_path
            .clone()
            .or_else(|| self.user.as_ref().map(|u| u.role.contacts_path().to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Builds a REST client carrying this state's token and settings.
    pub fn client(&self) -> Result<ApiClient, ApiError> {
        let auth = AuthSession::new(self.token.clone());
        let client = ApiClient::with_timeout(&self.base_url, auth, self.request_timeout())?;
        Ok(match self.contacts_path() {
            Some(path) => client.with_contacts_path(path),
            None => client,
        })
    }

    pub fn clear_login(&mut self) {
        self.token = None;
        self.user = None;
    }
}
