//! In-memory repository.
//!
//! This is the reference implementation of [`Repository`] and [`Session`].
//! A shared workspace tree holds persisted content; each session works on
//! its own copy and publishes it on `save`.
//!
//! ## Limitations
//!
//! - **Last save wins**: `save()` publishes the session's whole tree, so two
//!   sessions saving interleaved edits overwrite each other.
//! - **`refresh(true)` is a no-op**: external saves are only picked up by
//!   `refresh(false)`.
//! - **Queries see persisted content only**, as on a real repository.
//! - **No node type enforcement** beyond protected properties and the
//!   single/multi-valued shape of existing properties.
//!
//! Use this repository for:
//! - Testing the node, reconciliation and query layers
//! - Offline edits of a JSON content snapshot

mod snapshot;
mod sql2;
mod tree;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use safetypin_core::{path, JCR_SQL2, MIXIN_TYPES, MIX_REFERENCEABLE, PRIMARY_TYPE, UUID};

use crate::error::{RepositoryError, Result};
use crate::session::{Credentials, NodeStatus, Repository, Session};
use crate::value::{JcrValue, PropertyData, RemoteProperty};

use tree::Tree;

fn is_protected(name: &str) -> bool {
    matches!(name, PRIMARY_TYPE | MIXIN_TYPES | UUID)
}

// ============================================================================
// MemoryRepository
// ============================================================================

/// In-memory content repository. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct MemoryRepository {
    inner: Arc<RepositoryInner>,
}

struct RepositoryInner {
    workspace: RwLock<Tree>,
    /// Accepted login; `None` accepts any credentials.
    credentials: Option<Credentials>,
    /// Paths whose removal is refused.
    locks: RwLock<HashSet<String>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// An empty repository (root node only) that accepts any login.
    pub fn new() -> Self {
        Self::with_tree(Tree::new(), None)
    }

    /// An empty repository that only accepts the given login.
    pub fn with_credentials(username: &str, password: &str) -> Self {
        Self::with_tree(Tree::new(), Some(Credentials::new(username, password)))
    }

    /// A repository seeded from a JSON content snapshot of the root node.
    pub fn from_json(snapshot: &serde_json::Value) -> Result<Self> {
        Ok(Self::with_tree(snapshot::import(snapshot)?, None))
    }

    fn with_tree(tree: Tree, credentials: Option<Credentials>) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                workspace: RwLock::new(tree),
                credentials,
                locks: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Export the persisted content beneath `node_path` as JSON.
    pub fn to_json(&self, node_path: &str) -> Result<serde_json::Value> {
        snapshot::export(&self.inner.workspace.read(), node_path)
    }

    /// Lock a node: any attempt to remove it (or an ancestor) fails.
    pub fn lock(&self, node_path: &str) {
        self.inner.locks.write().insert(node_path.to_string());
    }

    pub fn unlock(&self, node_path: &str) {
        self.inner.locks.write().remove(node_path);
    }

    /// Open a session directly, without going through the trait object.
    pub fn open_session(&self, credentials: &Credentials) -> Result<MemorySession> {
        if let Some(expected) = &self.inner.credentials {
            if expected != credentials {
                return Err(RepositoryError::Login(format!(
                    "invalid credentials for {}",
                    credentials.username
                )));
            }
        }
        let tree = self.inner.workspace.read().clone();
        Ok(MemorySession {
            repository: self.inner.clone(),
            user_id: credentials.username.clone(),
            live: AtomicBool::new(true),
            state: RwLock::new(SessionState {
                working: tree.clone(),
                base: tree,
            }),
        })
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn login(&self, url: &str, credentials: &Credentials) -> Result<Arc<dyn Session>> {
        let session = self.open_session(credentials)?;
        tracing::debug!(url, user = %credentials.username, "Opened in-memory session");
        Ok(Arc::new(session))
    }
}

// ============================================================================
// MemorySession
// ============================================================================

struct SessionState {
    /// Session view, including pending changes.
    working: Tree,
    /// Persisted state as of the last save or refresh.
    base: Tree,
}

/// A session against a [`MemoryRepository`].
pub struct MemorySession {
    repository: Arc<RepositoryInner>,
    user_id: String,
    live: AtomicBool,
    state: RwLock<SessionState>,
}

impl MemorySession {
    fn ensure_live(&self) -> Result<()> {
        if self.live.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::SessionClosed)
        }
    }

    fn locked_within(&self, node_path: &str) -> Option<String> {
        self.repository
            .locks
            .read()
            .iter()
            .find(|l| *l == node_path || path::is_descendant_of(l, node_path))
            .cloned()
    }
}

#[async_trait]
impl Session for MemorySession {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    async fn logout(&self) -> Result<()> {
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.ensure_live()?;
        let mut state = self.state.write();
        *self.repository.workspace.write() = state.working.clone();
        state.base = state.working.clone();
        Ok(())
    }

    async fn refresh(&self, keep_changes: bool) -> Result<()> {
        self.ensure_live()?;
        if !keep_changes {
            let persisted = self.repository.workspace.read().clone();
            let mut state = self.state.write();
            state.working = persisted.clone();
            state.base = persisted;
        }
        Ok(())
    }

    async fn node_exists(&self, node_path: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.state.read().working.contains(node_path))
    }

    async fn primary_type(&self, node_path: &str) -> Result<String> {
        self.ensure_live()?;
        Ok(self.state.read().working.node(node_path)?.primary_type.clone())
    }

    async fn node_status(&self, node_path: &str) -> Result<NodeStatus> {
        self.ensure_live()?;
        let state = self.state.read();
        let current = state.working.node(node_path)?;
        let is_new = !state.base.contains(node_path);
        Ok(NodeStatus {
            is_new,
            is_modified: is_new || state.base.get(node_path) != Some(current),
        })
    }

    async fn child_names(&self, node_path: &str) -> Result<Vec<String>> {
        self.ensure_live()?;
        Ok(self.state.read().working.node(node_path)?.children.clone())
    }

    async fn add_node(&self, node_path: &str, primary_type: &str) -> Result<()> {
        self.ensure_live()?;
        if primary_type.trim().is_empty() {
            return Err(RepositoryError::ConstraintViolation(
                "primary type cannot be blank".to_string(),
            ));
        }
        let mut state = self.state.write();
        let parent = path::parent(node_path)
            .ok_or_else(|| RepositoryError::ItemExists(node_path.to_string()))?;
        if !state.working.contains(parent) {
            return Err(RepositoryError::PathNotFound(parent.to_string()));
        }
        state.working.add(node_path, primary_type)
    }

    async fn remove_node(&self, node_path: &str) -> Result<()> {
        self.ensure_live()?;
        if let Some(locked) = self.locked_within(node_path) {
            return Err(RepositoryError::Locked(locked));
        }
        self.state.write().working.remove(node_path)
    }

    async fn move_node(&self, src_path: &str, dest_path: &str) -> Result<()> {
        self.ensure_live()?;
        if let Some(locked) = self.locked_within(src_path) {
            return Err(RepositoryError::Locked(locked));
        }
        self.state.write().working.move_subtree(src_path, dest_path)
    }

    async fn order_before(
        &self,
        parent_path: &str,
        src_name: &str,
        dest_name: Option<&str>,
    ) -> Result<()> {
        self.ensure_live()?;
        self.state
            .write()
            .working
            .order_before(parent_path, src_name, dest_name)
    }

    async fn refresh_node(&self, node_path: &str, keep_changes: bool) -> Result<()> {
        self.ensure_live()?;
        if keep_changes {
            return Ok(());
        }
        let mut state = self.state.write();
        state.working.node(node_path)?;
        let SessionState { working, base } = &mut *state;
        working.restore_subtree(node_path, base);
        Ok(())
    }

    async fn set_primary_type(&self, node_path: &str, primary_type: &str) -> Result<()> {
        self.ensure_live()?;
        if primary_type.trim().is_empty() {
            return Err(RepositoryError::ConstraintViolation(
                "primary type cannot be blank".to_string(),
            ));
        }
        self.state.write().working.node_mut(node_path)?.primary_type = primary_type.to_string();
        Ok(())
    }

    async fn mixin_types(&self, node_path: &str) -> Result<Vec<String>> {
        self.ensure_live()?;
        Ok(self.state.read().working.node(node_path)?.mixins.clone())
    }

    async fn add_mixin(&self, node_path: &str, mixin: &str) -> Result<()> {
        self.ensure_live()?;
        let mut state = self.state.write();
        let node = state.working.node_mut(node_path)?;
        if node.mixins.iter().any(|m| m == mixin) {
            return Ok(());
        }
        node.mixins.push(mixin.to_string());
        if mixin == MIX_REFERENCEABLE {
            node.properties
                .entry(UUID.to_string())
                .or_insert_with(|| PropertyData::Single(JcrValue::String(Uuid::new_v4().to_string())));
        }
        Ok(())
    }

    async fn remove_mixin(&self, node_path: &str, mixin: &str) -> Result<()> {
        self.ensure_live()?;
        let mut state = self.state.write();
        let node = state.working.node_mut(node_path)?;
        let before = node.mixins.len();
        node.mixins.retain(|m| m != mixin);
        if node.mixins.len() == before {
            return Err(RepositoryError::ConstraintViolation(format!(
                "{mixin} is not assigned to {node_path}"
            )));
        }
        if mixin == MIX_REFERENCEABLE {
            node.properties.remove(UUID);
        }
        Ok(())
    }

    async fn property(&self, node_path: &str, name: &str) -> Result<RemoteProperty> {
        self.ensure_live()?;
        let state = self.state.read();
        let node = state.working.node(node_path)?;
        let missing = || RepositoryError::PathNotFound(path::join(node_path, name));
        match name {
            PRIMARY_TYPE => Ok(RemoteProperty::new(
                name,
                PropertyData::Single(JcrValue::Name(node.primary_type.clone())),
                true,
            )),
            MIXIN_TYPES if !node.mixins.is_empty() => Ok(RemoteProperty::new(
                name,
                PropertyData::Multiple(node.mixins.iter().cloned().map(JcrValue::Name).collect()),
                true,
            )),
            MIXIN_TYPES => Err(missing()),
            _ => node
                .properties
                .get(name)
                .map(|data| RemoteProperty::new(name, data.clone(), is_protected(name)))
                .ok_or_else(missing),
        }
    }

    async fn properties(&self, node_path: &str) -> Result<Vec<RemoteProperty>> {
        self.ensure_live()?;
        let state = self.state.read();
        let node = state.working.node(node_path)?;
        let mut props = vec![RemoteProperty::new(
            PRIMARY_TYPE,
            PropertyData::Single(JcrValue::Name(node.primary_type.clone())),
            true,
        )];
        if !node.mixins.is_empty() {
            props.push(RemoteProperty::new(
                MIXIN_TYPES,
                PropertyData::Multiple(node.mixins.iter().cloned().map(JcrValue::Name).collect()),
                true,
            ));
        }
        props.extend(
            node.properties
                .iter()
                .map(|(name, data)| RemoteProperty::new(name.as_str(), data.clone(), is_protected(name))),
        );
        Ok(props)
    }

    async fn set_property(&self, node_path: &str, name: &str, data: PropertyData) -> Result<()> {
        self.ensure_live()?;
        if is_protected(name) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "{name} is protected"
            )));
        }
        if !data.is_homogeneous() {
            return Err(RepositoryError::ValueFormat(format!(
                "values of {name} must share one type"
            )));
        }
        let mut state = self.state.write();
        let node = state.working.node_mut(node_path)?;
        if let Some(existing) = node.properties.get(name) {
            if existing.is_multiple() != data.is_multiple() {
                return Err(RepositoryError::ValueFormat(format!(
                    "cannot change {} between single- and multi-valued",
                    path::join(node_path, name)
                )));
            }
        }
        node.properties.insert(name.to_string(), data);
        Ok(())
    }

    async fn remove_property(&self, node_path: &str, name: &str) -> Result<()> {
        self.ensure_live()?;
        if is_protected(name) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "{name} is protected"
            )));
        }
        let mut state = self.state.write();
        let node = state.working.node_mut(node_path)?;
        node.properties
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::PathNotFound(path::join(node_path, name)))
    }

    async fn execute_query(&self, statement: &str, language: &str) -> Result<Vec<String>> {
        self.ensure_live()?;
        if language != JCR_SQL2 {
            return Err(RepositoryError::InvalidQuery(format!(
                "unsupported query language {language}"
            )));
        }
        let query = sql2::parse(statement)?;
        let paths = sql2::evaluate(&query, &self.repository.workspace.read());
        tracing::debug!(statement, hits = paths.len(), "Executed query");
        Ok(paths)
    }
}
