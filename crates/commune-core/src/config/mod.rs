//! Client runtime configuration.
//!
//! A single `ClientConfig` drives the request layer, the read resilience
//! policy, the auth redirect and the local store location. It is read from a
//! JSON file (missing or malformed files fall back to defaults) and then
//! overridden by environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::util::{normalize_base_url, normalize_text_option};

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue. Veuillez réessayer.";

pub const ENV_API_URL: &str = "COMMUNE_API_URL";
pub const ENV_STORE_DIR: &str = "COMMUNE_STORE_DIR";

const DEFAULT_REDIRECT_DELAY_MS: u64 = 2_000;
const DEFAULT_READ_RETRY_DELAY_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    /// Route the UI navigates to after an auth signal.
    pub login_route: String,
    /// Delay between the auth notice and the login redirect.
    pub redirect_delay_ms: u64,
    /// Delays before each read retry; empty disables retries.
    pub read_retry_delays_ms: Vec<u64>,
    pub request_timeout_secs: u64,
    /// Shown when a failure carries no server message.
    pub generic_error_message: String,
    pub store_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            read_retry_delays_ms: vec![DEFAULT_READ_RETRY_DELAY_MS],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            generic_error_message: GENERIC_ERROR_MESSAGE.to_string(),
            store_dir: None,
        }
    }
}

impl ClientConfig {
    /// Normalized API base URL, or an error when it is missing or invalid.
    pub fn api_base_url(&self) -> std::result::Result<String, String> {
        let raw = normalize_text_option(self.api_base_url.clone()).ok_or_else(|| {
            format!("API base URL is not configured (set {ENV_API_URL} or run `commune config init`)")
        })?;
        normalize_base_url(&raw)
    }

    pub const fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.read_retry_delays_ms
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        )
    }

    /// Directory of the local key/value store.
    pub fn resolved_store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(default_store_dir)
    }

    /// Apply environment overrides using the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(dir) = normalize_text_option(lookup(ENV_STORE_DIR)) {
            self.store_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Load configuration from `path`.
    ///
    /// A missing file yields defaults; unreadable or malformed files are
    /// logged and also yield defaults.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(
                        "Failed to parse client config at {}: {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                tracing::warn!(
                    "Failed to read client config at {}: {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("commune")
        .join("store")
}
