//! Connection configuration for a content repository.
//!
//! Configuration is loaded from (in priority order):
//! 1. `JCR_USERNAME` / `JCR_PASSWORD` (development login)
//! 2. Environment variables (`SAFETYPIN_JCR__` prefix)
//! 3. Config file (`safetypin.toml`, `[jcr]` section)
//! 4. Defaults

use serde::Deserialize;

use crate::error::Result;

/// Where and how to reach the repository and its search service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct JcrConfig {
    /// Repository host URL (e.g. "http://localhost:4502").
    #[serde(default = "default_hostname")]
    pub hostname: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Server endpoint appended to a hostname that has no path.
    #[serde(default = "default_server_path")]
    pub server_path: String,

    /// Path of the HTTP search service on the same host.
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,
}

fn default_hostname() -> String {
    "http://localhost:4502".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_server_path() -> String {
    "/crx/server".to_string()
}

fn default_search_endpoint() -> String {
    "/bin/querybuilder.json".to_string()
}

impl Default for JcrConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            username: default_username(),
            password: default_password(),
            server_path: default_server_path(),
            search_endpoint: default_search_endpoint(),
        }
    }
}

impl JcrConfig {
    /// Configuration for a given host with the default endpoints.
    pub fn new(hostname: &str, username: &str, password: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    /// Load from `<file_prefix>.toml` and the environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        load_with_dev_login(
            file_prefix,
            std::env::var("JCR_USERNAME").ok(),
            std::env::var("JCR_PASSWORD").ok(),
        )
    }

    /// Local development instance, credentials from `JCR_USERNAME` / `JCR_PASSWORD`.
    pub fn dev() -> Self {
        let defaults = Self::default();
        Self {
            username: std::env::var("JCR_USERNAME").unwrap_or(defaults.username.clone()),
            password: std::env::var("JCR_PASSWORD").unwrap_or(defaults.password.clone()),
            ..defaults
        }
    }
}

fn load_with_dev_login(
    file_prefix: &str,
    username: Option<String>,
    password: Option<String>,
) -> Result<JcrConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("SAFETYPIN")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("jcr.username", username)?
        .set_override_option("jcr.password", password)?
        .build()?;

    match cfg.get::<JcrConfig>("jcr") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(file_prefix, "No [jcr] configuration found, using defaults");
            Ok(JcrConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}
