//! Host configuration: user and global JSON files, read-only at runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::AppError;

/// Which configuration file a lookup reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    /// Per-user configuration.
    User,
    /// Machine-wide configuration installed with the app.
    Global,
}

/// Keys this layer reads from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Pod address.
    #[serde(default)]
    pub url: Option<String>,
    /// Keep the main window above other windows.
    #[serde(default)]
    pub always_on_top: Option<bool>,
    /// Explicit proxy used for credentialed login retries.
    #[serde(default)]
    pub proxy_server: Option<String>,
    /// Override path of the external capture tool.
    #[serde(default)]
    pub capture_tool: Option<PathBuf>,
}

impl HostConfig {
    /// Reads one configuration file. A missing file is an empty config.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file absent");
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(AppError::Config(format!(
                    "cannot read {}: {error}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&raw)
            .map_err(|error| AppError::Config(format!("invalid {}: {error}", path.display())))
    }

    /// Parsed proxy server URL, ignoring blank values.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the value is not a URL.
    pub fn proxy_server_url(&self) -> Result<Option<Url>, AppError> {
        match self.proxy_server.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Url::parse(raw)
                .map(Some)
                .map_err(|error| AppError::Config(format!("invalid proxyServer: {error}"))),
        }
    }
}

/// Read-only configuration lookups.
pub trait ConfigStore: Send + Sync {
    /// Configuration of one scope.
    fn get(&self, scope: ConfigScope) -> &HostConfig;
}

impl dyn ConfigStore + '_ {
    /// First value found in user then global configuration.
    pub fn effective<T>(&self, pick: impl Fn(&HostConfig) -> Option<T>) -> Option<T> {
        pick(self.get(ConfigScope::User)).or_else(|| pick(self.get(ConfigScope::Global)))
    }
}

/// Configuration loaded once from JSON files.
#[derive(Debug, Clone, Default)]
pub struct JsonConfigStore {
    user: HostConfig,
    global: HostConfig,
}

impl JsonConfigStore {
    /// Builds a store from already-parsed configurations.
    pub fn new(user: HostConfig, global: HostConfig) -> Self {
        Self { user, global }
    }

    /// Loads the optional user and global files.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when an existing file is unreadable.
    pub fn load(user: Option<&Path>, global: Option<&Path>) -> Result<Self, AppError> {
        let user = user.map(HostConfig::load).transpose()?.unwrap_or_default();
        let global = global.map(HostConfig::load).transpose()?.unwrap_or_default();
        info!(
            user_url = user.url.is_some(),
            global_url = global.url.is_some(),
            "configuration loaded"
        );
        Ok(Self::new(user, global))
    }
}

impl ConfigStore for JsonConfigStore {
    fn get(&self, scope: ConfigScope) -> &HostConfig {
        match scope {
            ConfigScope::User => &self.user,
            ConfigScope::Global => &self.global,
        }
    }
}
