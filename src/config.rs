//! Top-level application configuration.
//!
//! Configuration is stored in `config.yaml` under the platform config
//! directory (or the file named by `PORTAL_CONFIG`) and includes:
//! - API base URL and request timeout
//! - Authentication token
//! - List defaults (page size, search debounce, infinite-scroll threshold)

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};
use crate::types::CurrentUser;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "PORTAL_CONFIG";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "PORTAL_BASE_URL";
/// Environment variable overriding the API token.
pub const TOKEN_ENV: &str = "PORTAL_API_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default, skip_serializing_if = "ListDefaults::is_default")]
    pub lists: ListDefaults,
}

/// API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Defaults applied to every list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDefaults {
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Quiet period before search input is sent, in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Distance from the bottom, in pixels, that triggers the next page
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: u32,
}

fn default_per_page() -> u32 {
    10
}

fn default_search_debounce_ms() -> u64 {
    400
}

fn default_scroll_threshold() -> u32 {
    100
}

impl Default for ListDefaults {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            search_debounce_ms: default_search_debounce_ms(),
            scroll_threshold: default_scroll_threshold(),
        }
    }
}

impl ListDefaults {
    /// Check if this config has default values (for serialization skip)
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }

        directories::ProjectDirs::from("com", "wholesale", "portal")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from(".portal").join("config.yaml"))
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            PortalError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                PortalError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content).map_err(|e| {
            PortalError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // Owner read/write only, the file may hold a token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)?;
        }

        Ok(())
    }

    /// Reject values the list controller cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.lists.per_page == 0 {
            return Err(PortalError::Config(
                "lists.per_page must be at least 1".to_string(),
            ));
        }
        if self.api.timeout == 0 {
            return Err(PortalError::Config(
                "api.timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the API base URL from environment variable or config
    pub fn base_url(&self) -> Option<String> {
        if let Ok(url) = env::var(BASE_URL_ENV)
            && !url.is_empty()
        {
            return Some(url);
        }

        self.api.base_url.clone()
    }

    /// Get the API token from environment variable or config
    pub fn token(&self) -> Option<String> {
        if let Ok(token) = env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            return Some(token);
        }

        self.auth.token.clone()
    }

    /// The user the CLI acts as.
    pub fn current_user(&self) -> CurrentUser {
        match self.token() {
            Some(token) => CurrentUser::anonymous().with_token(token),
            None => CurrentUser::anonymous(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout)
    }

    /// Set a value by dotted key, e.g. `lists.per_page`.
    ///
    /// The configuration is left untouched when the key or value is invalid.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key {
            "api.base_url" => {
                url::Url::parse(value)?;
                updated.api.base_url = Some(value.to_string());
            }
            "api.timeout" => updated.api.timeout = parse_number(key, value)?,
            "auth.token" => updated.auth.token = Some(value.to_string()),
            "lists.per_page" => updated.lists.per_page = parse_number(key, value)?,
            "lists.search_debounce_ms" => {
                updated.lists.search_debounce_ms = parse_number(key, value)?
            }
            "lists.scroll_threshold" => updated.lists.scroll_threshold = parse_number(key, value)?,
            _ => {
                return Err(PortalError::Config(format!(
                    "unknown config key '{key}'. Valid keys: {}",
                    VALID_KEYS.join(", ")
                )));
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Keys accepted by `Config::set_value`
pub const VALID_KEYS: &[&str] = &[
    "api.base_url",
    "api.timeout",
    "auth.token",
    "lists.per_page",
    "lists.search_debounce_ms",
    "lists.scroll_threshold",
];

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PortalError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}
