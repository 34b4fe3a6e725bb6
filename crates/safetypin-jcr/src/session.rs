//! The capability surface of a remote content repository.
//!
//! Everything the node layer does goes through [`Session`]. Nodes are
//! addressed by absolute path; the session keeps transient (unsaved)
//! changes until [`Session::save`] publishes all of them at once.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::value::{PropertyData, RemoteProperty};

/// Username/password pair presented at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transient state of a node within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeStatus {
    /// Added in this session and never saved.
    pub is_new: bool,
    /// Carries unsaved changes (new nodes count as modified).
    pub is_modified: bool,
}

/// A repository that hands out sessions.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Open a session against the server endpoint at `url`.
    async fn login(&self, url: &str, credentials: &Credentials) -> Result<Arc<dyn Session>>;
}

/// A login-scoped connection to the repository.
///
/// Sessions are not reentrant: callers needing concurrency open one
/// session per task.
#[async_trait]
pub trait Session: Send + Sync {
    fn user_id(&self) -> &str;

    fn is_live(&self) -> bool;

    async fn logout(&self) -> Result<()>;

    /// Persist every pending change in the session.
    async fn save(&self) -> Result<()>;

    /// Re-read persisted state, discarding pending changes unless `keep_changes`.
    async fn refresh(&self, keep_changes: bool) -> Result<()>;

    // ── Nodes ───────────────────────────────────────────────────

    async fn node_exists(&self, path: &str) -> Result<bool>;

    async fn primary_type(&self, path: &str) -> Result<String>;

    async fn node_status(&self, path: &str) -> Result<NodeStatus>;

    /// Names of the child nodes, in their stored order.
    async fn child_names(&self, path: &str) -> Result<Vec<String>>;

    /// Stage a new node at `path`. The parent must already exist.
    async fn add_node(&self, path: &str, primary_type: &str) -> Result<()>;

    async fn remove_node(&self, path: &str) -> Result<()>;

    async fn move_node(&self, src_path: &str, dest_path: &str) -> Result<()>;

    /// Place child `src_name` of `parent_path` before `dest_name`, or last when `None`.
    async fn order_before(
        &self,
        parent_path: &str,
        src_name: &str,
        dest_name: Option<&str>,
    ) -> Result<()>;

    /// Discard (or keep) pending changes beneath `path` only.
    async fn refresh_node(&self, path: &str, keep_changes: bool) -> Result<()>;

    async fn set_primary_type(&self, path: &str, primary_type: &str) -> Result<()>;

    async fn mixin_types(&self, path: &str) -> Result<Vec<String>>;

    async fn add_mixin(&self, path: &str, mixin: &str) -> Result<()>;

    async fn remove_mixin(&self, path: &str, mixin: &str) -> Result<()>;

    // ── Properties ──────────────────────────────────────────────

    /// Fails with `PathNotFound` when the property is absent.
    async fn property(&self, path: &str, name: &str) -> Result<RemoteProperty>;

    async fn properties(&self, path: &str) -> Result<Vec<RemoteProperty>>;

    async fn set_property(&self, path: &str, name: &str, data: PropertyData) -> Result<()>;

    async fn remove_property(&self, path: &str, name: &str) -> Result<()>;

    // ── Queries ─────────────────────────────────────────────────

    /// Run a query and return the matching node paths in result order.
    async fn execute_query(&self, statement: &str, language: &str) -> Result<Vec<String>>;
}
