//! Purpose: Hold SDK configuration loaded from files, env vars, and flags.
//! Exports: `Config`, env var name constants.
//! Role: Explicit value passed to `Client`; replaces any process-wide config store.
//! Invariants: `validate` must pass before a `Client` is built from the config.
//! Invariants: Later sources override earlier ones (file, then env, then flags).

use super::token::{AccessToken, App};
use crate::core::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const ENV_CLIENT_ID: &str = "STEEIN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "STEEIN_CLIENT_SECRET";
pub const ENV_API_VERSION: &str = "STEEIN_API_VERSION";
pub const ENV_ACCESS_TOKEN: &str = "STEEIN_ACCESS_TOKEN";
pub const ENV_BASE_URL: &str = "STEEIN_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "STEEIN_TIMEOUT_SECS";

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_BASE_URL: &str = "https://www.steein.ru";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_api_version")]
    pub default_api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_access_token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            default_api_version: default_api_version(),
            default_access_token: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read config file {}", path.display()))
                .with_source(err)
        })?;
        serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid config file {}", path.display()))
                .with_hint("Config files are JSON objects; see `steein --help`.")
                .with_source(err)
        })
    }

    /// Defaults overlaid with the `STEEIN_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::default().merge_env()
    }

    pub fn merge_env(self) -> Result<Self, Error> {
        self.merge_vars(|name| std::env::var(name).ok())
    }

    /// Overlays values returned by `lookup`; empty values are ignored.
    pub fn merge_vars<F>(mut self, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(value) = get(ENV_CLIENT_ID) {
            self.client_id = value;
        }
        if let Some(value) = get(ENV_CLIENT_SECRET) {
            self.client_secret = value;
        }
        if let Some(value) = get(ENV_API_VERSION) {
            self.default_api_version = value;
        }
        if let Some(value) = get(ENV_ACCESS_TOKEN) {
            self.default_access_token = Some(value);
        }
        if let Some(value) = get(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = get(ENV_TIMEOUT_SECS) {
            self.timeout_secs = value.trim().parse().map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error> {
        App::new(self.client_id.as_str(), self.client_secret.as_str())?;
        self.parsed_base_url()?;
        if self.timeout_secs == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("timeout_secs must be greater than zero"));
        }
        if self.api_version_prefix().is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("default_api_version must not be empty"));
        }
        Ok(())
    }

    pub fn app(&self) -> Result<App, Error> {
        App::new(self.client_id.as_str(), self.client_secret.as_str())
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.default_access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(AccessToken::new)
    }

    /// Path prefix for the configured version: `v1` becomes `/api/v1`.
    pub fn api_version_prefix(&self) -> String {
        version_prefix(&self.default_api_version)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn parsed_base_url(&self) -> Result<Url, Error> {
        let url = Url::parse(self.base_url.trim()).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid base_url: {}", self.base_url))
                .with_source(err)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("base_url must use http or https: {}", self.base_url)));
        }
        Ok(url)
    }
}

/// Accepts `v1`, `/v1`, `api/v1` and `/api/v1/`; all map to `/api/v1`.
pub fn version_prefix(version: &str) -> String {
    let trimmed = version.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("api/") {
        return format!("/{trimmed}");
    }
    format!("/api/{trimmed}")
}
