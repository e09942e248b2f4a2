//! Synchronization configuration.
//!
//! Values come from the application (or the environment via
//! [`SyncConfig::from_env`]); nothing here is hardcoded into the components.

use crate::cache::DEFAULT_CACHE_KEY;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Remote base URL variable
pub const ENV_API_URL: &str = "PANTRY_API_URL";
/// User-data path variable
pub const ENV_USER_DATA_PATH: &str = "PANTRY_USER_DATA_PATH";
/// Request timeout variable (whole seconds)
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "PANTRY_REQUEST_TIMEOUT_SECS";
/// Cache directory variable
pub const ENV_CACHE_DIR: &str = "PANTRY_CACHE_DIR";
/// Cache key variable
pub const ENV_CACHE_KEY: &str = "PANTRY_CACHE_KEY";
/// Bearer token variable
pub const ENV_API_TOKEN: &str = "PANTRY_API_TOKEN";

/// Where the snapshot lives locally and remotely.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the backend (e.g. `https://api.example.com`).
    ///
    /// Default: `http://localhost:3000`
    pub api_base_url: String,

    /// Path of the user-data resource, appended to the base URL.
    ///
    /// Default: `/api/user-data`
    pub user_data_path: String,

    /// Timeout for every remote request, in seconds.
    ///
    /// Default: 10
    pub request_timeout_secs: u64,

    /// Directory of the file cache.
    ///
    /// Default: `.pantry-cache`
    pub cache_dir: PathBuf,

    /// Key the snapshot is stored under.
    ///
    /// Default: `pantry:app-state`
    pub cache_key: String,

    /// Bearer token sent with remote requests.
    pub api_token: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            user_data_path: "/api/user-data".to_string(),
            request_timeout_secs: 10,
            cache_dir: PathBuf::from(".pantry-cache"),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            api_token: None,
        }
    }
}

impl SyncConfig {
    /// Create configuration for the backend at `api_base_url`.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Set the user-data path.
    #[must_use]
    pub fn with_user_data_path(mut self, path: impl Into<String>) -> Self {
        self.user_data_path = path.into();
        self
    }

    /// Set the request timeout (whole seconds; sub-second parts are dropped).
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the cache key.
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Load configuration from `PANTRY_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or the result
    /// fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api_base_url = url;
        }
        if let Some(path) = lookup(ENV_USER_DATA_PATH) {
            config.user_data_path = path;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs =
                secs.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidValue {
                        key: ENV_REQUEST_TIMEOUT_SECS,
                        message: e.to_string(),
                    }
                })?;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup(ENV_CACHE_KEY) {
            config.cache_key = key;
        }
        config.api_token = lookup(ENV_API_TOKEN).filter(|token| !token.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] for an empty base URL or cache key,
    /// and [`ConfigError::InvalidValue`] for a non-HTTP base URL or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingValue(ENV_API_URL));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: ENV_API_URL,
                message: format!("'{}' is not an http(s) URL", self.api_base_url),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_REQUEST_TIMEOUT_SECS,
                message: "timeout must be at least one second".to_string(),
            });
        }
        if self.cache_key.is_empty() {
            return Err(ConfigError::MissingValue(ENV_CACHE_KEY));
        }
        Ok(())
    }

    /// Full URL of the user-data resource.
    #[must_use]
    pub fn user_data_url(&self) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        let path = self.user_data_path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Timeout for every remote request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
