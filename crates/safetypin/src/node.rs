//! Node handles.
//!
//! A [`Node`] is a path plus the session it lives in. It holds no cached
//! state: every read goes to the session, so two handles on the same path
//! always agree.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, warn};

use safetypin_core::{path, PRIMARY_TYPE};
use safetypin_jcr::{PropertyType, RepositoryError, Session};

use crate::codec;
use crate::error::{Error, Result};
use crate::jcr::Jcr;
use crate::value::Value;

#[derive(Clone)]
pub struct Node {
    path: String,
    jcr: Jcr,
}

impl Node {
    pub(crate) fn attach(jcr: &Jcr, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            jcr: jcr.clone(),
        }
    }

    /// The node at `path`, or `None` when there is none.
    ///
    /// A relative path is a programming error and fails with
    /// [`Error::InvalidPath`] whatever the repository holds.
    pub async fn find(jcr: &Jcr, path: &str) -> Result<Option<Node>> {
        let path = absolute(path)?;
        if jcr.session().node_exists(&path).await? {
            Ok(Some(Self::attach(jcr, path)))
        } else {
            Ok(None)
        }
    }

    pub async fn exists(jcr: &Jcr, path: &str) -> Result<bool> {
        Ok(Self::find(jcr, path).await?.is_some())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        path::name(&self.path)
    }

    pub fn jcr(&self) -> &Jcr {
        &self.jcr
    }

    pub(crate) fn session(&self) -> &dyn Session {
        self.jcr.session()
    }

    pub fn is_root(&self) -> bool {
        path::is_root(&self.path)
    }

    // ── Types ───────────────────────────────────────────────────

    pub async fn primary_type(&self) -> Result<String> {
        Ok(self.session().primary_type(&self.path).await?)
    }

    /// The only way to change a node's primary type.
    pub async fn set_primary_type(&self, primary_type: &str) -> Result<()> {
        if primary_type.trim().is_empty() {
            return Err(Error::InvalidArgument("primary type cannot be blank".into()));
        }
        self.session().set_primary_type(&self.path, primary_type).await?;
        debug!(path = %self.path, primary_type, "Changed primary type");
        Ok(())
    }

    pub async fn mixin_types(&self) -> Result<Vec<String>> {
        Ok(self.session().mixin_types(&self.path).await?)
    }

    pub async fn add_mixin(&self, mixin: &str) -> Result<()> {
        Ok(self.session().add_mixin(&self.path, mixin).await?)
    }

    pub async fn remove_mixin(&self, mixin: &str) -> Result<()> {
        Ok(self.session().remove_mixin(&self.path, mixin).await?)
    }

    // ── Navigation ──────────────────────────────────────────────

    /// Look up a node beneath this one. An empty relative path is rejected.
    pub async fn child(&self, relative_path: &str) -> Result<Option<Node>> {
        if relative_path.trim_matches('/').is_empty() {
            return Err(Error::InvalidArgument("empty relative path".into()));
        }
        let child_path = path::join(&self.path, relative_path);
        if self.session().node_exists(&child_path).await? {
            Ok(Some(Self::attach(&self.jcr, child_path)))
        } else {
            Ok(None)
        }
    }

    pub async fn children(&self) -> Result<Vec<Node>> {
        let names = self.session().child_names(&self.path).await?;
        Ok(names
            .iter()
            .map(|name| Self::attach(&self.jcr, path::join(&self.path, name)))
            .collect())
    }

    /// Every node beneath this one, each child followed by its own subtree.
    pub async fn descendants(&self) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        let mut stack: Vec<Node> = self.children().await?.into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().await?.into_iter().rev());
            out.push(node);
        }
        Ok(out)
    }

    pub fn parent(&self) -> Result<Node> {
        let parent = path::parent(&self.path)
            .ok_or_else(|| Error::node("The root node does not have a parent"))?;
        Ok(Self::attach(&self.jcr, parent))
    }

    /// Ancestors, nearest first, ending at the root.
    pub fn parents(&self) -> Vec<Node> {
        path::ancestors(&self.path)
            .into_iter()
            .map(|p| Self::attach(&self.jcr, p))
            .collect()
    }

    // ── Properties ──────────────────────────────────────────────

    /// Decoded value of `name`. An absent property is [`Error::NilProperty`].
    pub async fn read_attribute(&self, name: &str) -> Result<Value> {
        match self.session().property(&self.path, name).await {
            Ok(property) => codec::decode(&property),
            Err(RepositoryError::PathNotFound(_)) => Err(Error::NilProperty(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<Value> {
        self.read_attribute(name).await
    }

    /// Write or (with `None`) remove a property.
    ///
    /// A value whose shape differs from the stored one (single vs multi)
    /// replaces it: the old property is removed first.
    pub async fn write_attribute(&self, name: &str, value: Option<Value>) -> Result<()> {
        if name == PRIMARY_TYPE {
            return Err(Error::Property(format!(
                "cannot change {PRIMARY_TYPE} property"
            )));
        }

        let Some(value) = value else {
            return match self.session().remove_property(&self.path, name).await {
                Ok(()) | Err(RepositoryError::PathNotFound(_)) => Ok(()),
                Err(e) => Err(e.into()),
            };
        };

        let data = codec::encode(&value)?;
        match self.session().property(&self.path, name).await {
            Ok(existing) if codec::is_multi_valued(&existing) != data.is_multiple() => {
                self.session().remove_property(&self.path, name).await?;
            }
            Ok(_) | Err(RepositoryError::PathNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.session().set_property(&self.path, name, data).await?;
        debug!(path = %self.path, property = name, "Wrote property");
        Ok(())
    }

    pub async fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write_attribute(name, Some(value.into())).await
    }

    pub async fn remove_attribute(&self, name: &str) -> Result<()> {
        self.write_attribute(name, None).await
    }

    /// Repository type tag of a property.
    pub async fn property_type(&self, name: &str) -> Result<PropertyType> {
        match self.session().property(&self.path, name).await {
            Ok(property) => Ok(property.property_type()),
            Err(RepositoryError::PathNotFound(_)) => Err(Error::NilProperty(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Client-writable properties.
    pub async fn properties(&self) -> Result<BTreeMap<String, Value>> {
        self.collect_properties(false).await
    }

    /// Repository-managed properties, such as the primary type and mixins.
    pub async fn protected_properties(&self) -> Result<BTreeMap<String, Value>> {
        self.collect_properties(true).await
    }

    async fn collect_properties(&self, protected: bool) -> Result<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for property in self.session().properties(&self.path).await? {
            if property.definition().protected == protected {
                out.insert(property.name().to_string(), codec::decode(&property)?);
            }
        }
        Ok(out)
    }

    /// Names of the client-writable properties, without decoding them.
    pub(crate) async fn property_names(&self) -> Result<Vec<String>> {
        Ok(self
            .session()
            .properties(&self.path)
            .await?
            .into_iter()
            .filter(|p| !p.definition().protected)
            .map(|p| p.name().to_string())
            .collect())
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Save the whole session. Returns whether this node is now clean.
    pub async fn save(&self) -> Result<bool> {
        self.jcr.save().await?;
        Ok(!self.is_changed().await?)
    }

    /// Drop unsaved changes beneath this node.
    pub async fn reload(&self) -> Result<()> {
        self.session().refresh_node(&self.path, false).await?;
        Ok(())
    }

    pub async fn is_changed(&self) -> Result<bool> {
        Ok(self.session().node_status(&self.path).await?.is_modified)
    }

    pub async fn is_new(&self) -> Result<bool> {
        Ok(self.session().node_status(&self.path).await?.is_new)
    }

    /// Remove the node and persist the removal.
    pub async fn destroy(self) -> Result<()> {
        let fail = |e: RepositoryError| {
            Error::node_caused_by(format!("Unable to destroy {} node: {e}", self.path), e)
        };
        self.session().remove_node(&self.path).await.map_err(fail)?;
        if let Err(e) = self.session().save().await {
            // Put the pending removal back so the node stays reachable.
            let parent = path::parent(&self.path).unwrap_or(path::ROOT);
            if let Err(refresh) = self.session().refresh_node(parent, false).await {
                warn!(path = %self.path, error = %refresh, "Unable to discard rejected removal");
            }
            return Err(fail(e));
        }
        info!(path = %self.path, "Destroyed node");
        Ok(())
    }

    // ── Structure ───────────────────────────────────────────────

    /// Move beneath `destination_parent`, keeping the name.
    pub async fn move_to(&mut self, destination_parent: &str) -> Result<()> {
        self.move_within(destination_parent, false).await
    }

    /// Move beneath `destination_parent`. With `auto_rename`, a taken name
    /// becomes the first free `<name>_<n>`.
    pub async fn move_within(&mut self, destination_parent: &str, auto_rename: bool) -> Result<()> {
        let parent = absolute(destination_parent)?;
        let name = self.name().to_string();
        let mut destination = path::join(&parent, &name);
        if self.session().node_exists(&destination).await? {
            if !auto_rename {
                return Err(Error::node(format!("Node already exists at {destination}")));
            }
            let mut n = 1;
            loop {
                destination = path::join(&parent, &format!("{name}_{n}"));
                if !self.session().node_exists(&destination).await? {
                    break;
                }
                n += 1;
            }
        }
        self.relocate(destination).await
    }

    pub async fn rename(&mut self, new_name: &str) -> Result<()> {
        path::validate_name(new_name).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        let parent = path::parent(&self.path)
            .ok_or_else(|| Error::node("The root node cannot be renamed"))?;
        let destination = path::join(parent, new_name);
        if self.session().node_exists(&destination).await? {
            return Err(Error::node(format!("Node already exists at {destination}")));
        }
        self.relocate(destination).await
    }

    async fn relocate(&mut self, destination: String) -> Result<()> {
        self.session()
            .move_node(&self.path, &destination)
            .await
            .map_err(|e| {
                Error::node_caused_by(format!("Unable to move {} to {destination}", self.path), e)
            })?;
        debug!(from = %self.path, to = %destination, "Moved node");
        self.path = destination;
        Ok(())
    }

    /// Place this node directly before `sibling` (a name or a sibling path).
    pub async fn order_before(&self, sibling: &str) -> Result<()> {
        let (parent, sibling) = self.sibling(sibling).await?;
        self.session()
            .order_before(&parent, self.name(), Some(sibling.as_str()))
            .await?;
        Ok(())
    }

    /// Place this node directly after `sibling` (a name or a sibling path).
    pub async fn order_after(&self, sibling: &str) -> Result<()> {
        let (parent, sibling) = self.sibling(sibling).await?;
        let others: Vec<String> = self
            .session()
            .child_names(&parent)
            .await?
            .into_iter()
            .filter(|n| n != self.name())
            .collect();
        let next = others
            .iter()
            .position(|n| *n == sibling)
            .and_then(|idx| others.get(idx + 1));
        self.session()
            .order_before(&parent, self.name(), next.map(String::as_str))
            .await?;
        Ok(())
    }

    async fn sibling(&self, sibling: &str) -> Result<(String, String)> {
        let not_sibling = || Error::node(format!("{sibling} is not a sibling of {}", self.path));
        let parent = path::parent(&self.path).ok_or_else(not_sibling)?.to_string();
        let name = if path::is_absolute(sibling) {
            if path::parent(sibling) != Some(parent.as_str()) {
                return Err(not_sibling());
            }
            path::name(sibling)
        } else {
            sibling
        };
        if name == self.name() {
            return Err(not_sibling());
        }
        let names = self.session().child_names(&parent).await?;
        if !names.iter().any(|n| n == name) {
            return Err(not_sibling());
        }
        Ok((parent, name.to_string()))
    }
}

/// Normalize an absolute path; anything else is [`Error::InvalidPath`].
pub(crate) fn absolute(p: &str) -> Result<String> {
    path::normalize(p).map_err(|_| Error::InvalidPath(p.to_string()))
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Node").field(&self.path).finish()
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}
