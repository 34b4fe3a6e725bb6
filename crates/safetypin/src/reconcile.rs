//! Applying blueprints to the repository.
//!
//! Per target path a node goes Absent -> Built (staged) -> Persisted, or
//! Existing -> Updated. Multi-step operations are not atomic: a failure
//! part-way leaves whatever was already staged or saved in place, and
//! callers recover with [`Node::reload`] or [`Node::destroy`].

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

use safetypin_core::{path, NT_UNSTRUCTURED};
use safetypin_jcr::RepositoryError;

use crate::blueprint::{BlueprintProperty, BuildTarget, NodeBlueprint, Properties};
use crate::error::{Error, Result};
use crate::jcr::Jcr;
use crate::node::{absolute, Node};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

impl Node {
    /// Stage a new node from a path or blueprint, without saving.
    ///
    /// Fails with [`Error::Node`] when the path is relative, already taken,
    /// or has a missing ancestor.
    pub async fn build(jcr: &Jcr, target: impl Into<BuildTarget>) -> Result<Node> {
        let blueprint = target.into().into_blueprint()?;
        let Some(raw_path) = blueprint.path() else {
            return Err(Error::NodeBlueprint("No path specified".into()));
        };
        let node_path = path::normalize(raw_path)
            .map_err(|_| Error::node(format!("Given path not absolute: {raw_path}")))?;
        Self::build_at(jcr, node_path, &blueprint).await
    }

    async fn build_at(jcr: &Jcr, node_path: String, blueprint: &NodeBlueprint) -> Result<Node> {
        let session = jcr.session();
        if session.node_exists(&node_path).await? {
            return Err(Error::node(format!("Node already exists at path: {node_path}")));
        }
        session
            .add_node(&node_path, blueprint.primary_type())
            .await
            .map_err(|e| match e {
                RepositoryError::PathNotFound(_) => Error::node_caused_by(
                    format!("Cannot add a new node to a non-existing parent at {node_path}"),
                    e,
                ),
                other => other.into(),
            })?;
        debug!(path = %node_path, primary_type = blueprint.primary_type(), "Staged node");

        let node = Self::attach(jcr, node_path);
        node.apply_properties(blueprint.properties()).await?;
        Ok(node)
    }

    /// Build, then save the session.
    pub async fn create(jcr: &Jcr, target: impl Into<BuildTarget>) -> Result<Node> {
        let node = Self::build(jcr, target).await?;
        node.save().await?;
        info!(path = %node.path(), "Created node");
        Ok(node)
    }

    /// Apply a blueprint to the existing node at its path, then save.
    pub async fn update(jcr: &Jcr, blueprint: &NodeBlueprint) -> Result<Node> {
        let raw_path = blueprint
            .path()
            .ok_or_else(|| Error::NodeBlueprint("No path specified".into()))?;
        let node = Self::find(jcr, raw_path)
            .await?
            .ok_or_else(|| Error::node(format!("No node to update at path: {raw_path}")))?;
        node.update_unsaved(blueprint).await?;
        node.save().await?;
        info!(path = %node.path(), "Updated node");
        Ok(node)
    }

    async fn update_unsaved(&self, blueprint: &NodeBlueprint) -> Result<()> {
        self.apply_properties(blueprint.properties()).await?;
        if self.primary_type().await? != blueprint.primary_type() {
            self.set_primary_type(blueprint.primary_type()).await?;
        }
        Ok(())
    }

    /// Create each blueprint whose path is free, update the rest.
    pub async fn create_or_update<I>(jcr: &Jcr, blueprints: I) -> Result<Vec<Node>>
    where
        I: IntoIterator<Item = NodeBlueprint>,
    {
        let mut nodes = Vec::new();
        for blueprint in blueprints {
            let raw_path = blueprint
                .path()
                .ok_or_else(|| Error::NodeBlueprint("No path specified".into()))?;
            let node_path = path::normalize(raw_path)
                .map_err(|_| Error::node(format!("Given path not absolute: {raw_path}")))?;
            let node = if Self::exists(jcr, &node_path).await? {
                Self::update(jcr, &blueprint).await?
            } else {
                Self::create(jcr, blueprint).await?
            };
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Create the missing ancestors of `node_path`, outermost first, as
    /// `nt:unstructured`, and save once.
    pub async fn create_parents(jcr: &Jcr, node_path: &str) -> Result<()> {
        let node_path = absolute(node_path)?;
        let mut missing = Vec::new();
        for ancestor in path::ancestors(&node_path) {
            if jcr.session().node_exists(&ancestor).await? {
                break;
            }
            missing.push(ancestor);
        }
        if missing.is_empty() {
            return Ok(());
        }
        for ancestor in missing.into_iter().rev() {
            Self::build_at(jcr, ancestor, &NodeBlueprint::pathless()).await?;
        }
        jcr.save().await
    }

    /// The node at `node_path`, created (and saved) if absent.
    pub async fn find_or_create(
        jcr: &Jcr,
        node_path: &str,
        primary_type: Option<&str>,
    ) -> Result<Node> {
        if let Some(node) = Self::find(jcr, node_path).await? {
            return Ok(node);
        }
        let blueprint = NodeBlueprint::new(node_path)?
            .with_primary_type(primary_type.unwrap_or(NT_UNSTRUCTURED));
        Self::create(jcr, blueprint).await
    }

    // ── Relative to this node ───────────────────────────────────

    pub async fn find_or_create_child(
        &self,
        name: &str,
        primary_type: Option<&str>,
    ) -> Result<Node> {
        Self::find_or_create(self.jcr(), &path::join(self.path(), name), primary_type).await
    }

    /// Stage a child at `name`, taking type and properties from `blueprint`.
    pub async fn build_child(&self, name: &str, blueprint: Option<&NodeBlueprint>) -> Result<Node> {
        Self::build(self.jcr(), self.child_blueprint(name, blueprint)).await
    }

    pub async fn create_child(&self, name: &str, blueprint: Option<&NodeBlueprint>) -> Result<Node> {
        Self::create(self.jcr(), self.child_blueprint(name, blueprint)).await
    }

    fn child_blueprint(&self, name: &str, blueprint: Option<&NodeBlueprint>) -> NodeBlueprint {
        let child_path = path::join(self.path(), name);
        match blueprint {
            Some(bp) => bp.at(child_path),
            None => NodeBlueprint::pathless().at(child_path),
        }
    }

    // ── Bulk properties ─────────────────────────────────────────

    /// Replace the node's writable properties with `desired`.
    ///
    /// Every name that is currently set or desired is rewritten: names
    /// missing from `desired` are removed. Nested blueprints update the
    /// existing child or stage a new one; neither is saved here.
    pub async fn set_properties<I, K, V>(&self, desired: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<BlueprintProperty>,
    {
        let desired: Properties = desired
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.apply_properties(&desired).await
    }

    fn apply_properties<'a>(&'a self, desired: &'a Properties) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut names = self.property_names().await?;
            for name in desired.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }

            for name in &names {
                match desired.get(name) {
                    None => self.write_attribute(name, None).await?,
                    Some(BlueprintProperty::Value(value)) => {
                        self.write_attribute(name, Some(value.clone())).await?
                    }
                    Some(BlueprintProperty::Child(child)) => {
                        self.write_attribute(name, None).await?;
                        let child_path = path::join(self.path(), name);
                        match Self::find(self.jcr(), &child_path).await? {
                            Some(existing) => existing.update_unsaved(child).await?,
                            None => {
                                Self::build_at(self.jcr(), child_path, child).await?;
                            }
                        }
                    }
                }
            }
            Ok(())
        })
    }
}
