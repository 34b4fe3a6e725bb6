//! The explicit session handle every node operation goes through.

use std::sync::Arc;

use reqwest::Url;
use tracing::info;

use safetypin_core::JcrConfig;
use safetypin_jcr::{Credentials, Repository, Session};

use crate::error::{Error, Result};

/// A logged-in repository session plus the configuration it was opened with.
///
/// Clones share the session. One handle is meant for sequential use; open a
/// second login for concurrent work.
#[derive(Clone)]
pub struct Jcr {
    session: Arc<dyn Session>,
    config: Arc<JcrConfig>,
}

impl Jcr {
    /// Log in to `repository` with the configured host and credentials.
    pub async fn login(repository: &dyn Repository, config: &JcrConfig) -> Result<Self> {
        let url = Self::parse_hostname(&config.hostname, &config.server_path)?;
        let credentials = Credentials::new(&config.username, &config.password);
        let session = repository.login(&url, &credentials).await?;
        info!(url = %url, user = %config.username, "Logged in");
        Ok(Self::from_session(session, config.clone()))
    }

    /// Wrap a session that was opened elsewhere.
    pub fn from_session(session: Arc<dyn Session>, config: JcrConfig) -> Self {
        Self {
            session,
            config: Arc::new(config),
        }
    }

    /// Append `server_path` to a host URL that has no path of its own.
    ///
    /// ```
    /// # use safetypin::Jcr;
    /// let url = Jcr::parse_hostname("http://localhost:4502", "/crx/server").unwrap();
    /// assert_eq!(url, "http://localhost:4502/crx/server");
    /// ```
    pub fn parse_hostname(hostname: &str, server_path: &str) -> Result<String> {
        let mut url = Url::parse(hostname)
            .map_err(|e| Error::InvalidArgument(format!("invalid hostname {hostname:?}: {e}")))?;
        if url.path().is_empty() || url.path() == "/" {
            url.set_path(server_path);
        }
        Ok(url.to_string())
    }

    /// End the session. Returns whether it is no longer live.
    pub async fn logout(&self) -> Result<bool> {
        self.session.logout().await?;
        info!(user = %self.session.user_id(), "Logged out");
        Ok(!self.session.is_live())
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_live()
    }

    pub fn is_logged_out(&self) -> bool {
        !self.is_logged_in()
    }

    /// Persist every pending change in the session, whichever node made it.
    pub async fn save(&self) -> Result<()> {
        self.session.save().await?;
        info!("Session saved");
        Ok(())
    }

    pub async fn refresh(&self, keep_changes: bool) -> Result<()> {
        self.session.refresh(keep_changes).await?;
        Ok(())
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    pub fn config(&self) -> &JcrConfig {
        &self.config
    }
}

impl std::fmt::Debug for Jcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jcr")
            .field("hostname", &self.config.hostname)
            .field("user", &self.session.user_id())
            .field("live", &self.session.is_live())
            .finish()
    }
}
