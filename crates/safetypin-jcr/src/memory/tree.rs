//! Path-keyed node storage backing the in-memory repository.

use std::collections::{BTreeMap, HashMap};

use safetypin_core::path;

use crate::error::{RepositoryError, Result};
use crate::value::PropertyData;

/// One stored node. Child order is significant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredNode {
    pub primary_type: String,
    pub mixins: Vec<String>,
    pub properties: BTreeMap<String, PropertyData>,
    pub children: Vec<String>,
}

impl StoredNode {
    fn new(primary_type: &str) -> Self {
        Self {
            primary_type: primary_type.to_string(),
            mixins: Vec::new(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// A whole content tree, root included.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tree {
    nodes: HashMap<String, StoredNode>,
}

impl Tree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            path::ROOT.to_string(),
            StoredNode::new(safetypin_core::REP_ROOT),
        );
        Self { nodes }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&StoredNode> {
        self.nodes.get(path)
    }

    pub fn node(&self, path: &str) -> Result<&StoredNode> {
        self.nodes
            .get(path)
            .ok_or_else(|| RepositoryError::PathNotFound(path.to_string()))
    }

    pub fn node_mut(&mut self, path: &str) -> Result<&mut StoredNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| RepositoryError::PathNotFound(path.to_string()))
    }

    /// Add a node beneath an existing parent, appended after its siblings.
    pub fn add(&mut self, node_path: &str, primary_type: &str) -> Result<()> {
        if self.contains(node_path) {
            return Err(RepositoryError::ItemExists(node_path.to_string()));
        }
        let parent_path = path::parent(node_path)
            .ok_or_else(|| RepositoryError::ItemExists(node_path.to_string()))?;
        let name = path::name(node_path).to_string();
        self.node_mut(parent_path)?.children.push(name);
        self.nodes
            .insert(node_path.to_string(), StoredNode::new(primary_type));
        Ok(())
    }

    /// Remove a node and everything beneath it.
    pub fn remove(&mut self, node_path: &str) -> Result<()> {
        let parent_path = path::parent(node_path).ok_or_else(|| {
            RepositoryError::ConstraintViolation("cannot remove the root node".to_string())
        })?;
        self.node(node_path)?;
        for p in self.subtree_paths(node_path) {
            self.nodes.remove(&p);
        }
        let name = path::name(node_path);
        if let Some(parent) = self.nodes.get_mut(parent_path) {
            parent.children.retain(|c| c != name);
        }
        Ok(())
    }

    /// Re-key the subtree at `src` to `dest`. A rename within the same
    /// parent keeps the sibling position; a move appends to the new parent.
    pub fn move_subtree(&mut self, src: &str, dest: &str) -> Result<()> {
        let src_parent = path::parent(src).ok_or_else(|| {
            RepositoryError::ConstraintViolation("cannot move the root node".to_string())
        })?;
        let dest_parent = path::parent(dest)
            .ok_or_else(|| RepositoryError::ItemExists(dest.to_string()))?;
        self.node(src)?;
        self.node(dest_parent)?;
        if self.contains(dest) {
            return Err(RepositoryError::ItemExists(dest.to_string()));
        }
        if path::is_descendant_of(dest, src) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "cannot move {src} beneath itself"
            )));
        }

        for old in self.subtree_paths(src) {
            if let Some(node) = self.nodes.remove(&old) {
                let new = format!("{dest}{}", &old[src.len()..]);
                self.nodes.insert(new, node);
            }
        }

        let src_name = path::name(src).to_string();
        let dest_name = path::name(dest).to_string();
        if src_parent == dest_parent {
            let parent = self.node_mut(src_parent)?;
            if let Some(slot) = parent.children.iter_mut().find(|c| **c == src_name) {
                *slot = dest_name;
            }
        } else {
            self.node_mut(src_parent)?.children.retain(|c| *c != src_name);
            self.node_mut(dest_parent)?.children.push(dest_name);
        }
        Ok(())
    }

    /// Reposition a child before a sibling, or last when `dest` is `None`.
    pub fn order_before(&mut self, parent_path: &str, src: &str, dest: Option<&str>) -> Result<()> {
        let parent = self.node_mut(parent_path)?;
        if !parent.children.iter().any(|c| c == src) {
            return Err(RepositoryError::PathNotFound(path::join(parent_path, src)));
        }
        if let Some(dest) = dest {
            if !parent.children.iter().any(|c| c == dest) {
                return Err(RepositoryError::PathNotFound(path::join(parent_path, dest)));
            }
            if dest == src {
                return Ok(());
            }
        }
        parent.children.retain(|c| c != src);
        match dest {
            Some(dest) => {
                let idx = parent
                    .children
                    .iter()
                    .position(|c| c == dest)
                    .unwrap_or(parent.children.len());
                parent.children.insert(idx, src.to_string());
            }
            None => parent.children.push(src.to_string()),
        }
        Ok(())
    }

    /// Replace the subtree at `node_path` with its state in `base`. A node
    /// absent from `base` is dropped.
    pub fn restore_subtree(&mut self, node_path: &str, base: &Tree) {
        for p in self.subtree_paths(node_path) {
            self.nodes.remove(&p);
        }

        let name = path::name(node_path).to_string();
        let parent_path = path::parent(node_path);

        if base.contains(node_path) {
            for p in base.subtree_paths(node_path) {
                if let Some(node) = base.get(&p) {
                    self.nodes.insert(p, node.clone());
                }
            }
            if let Some(parent_path) = parent_path {
                let base_index = base
                    .get(parent_path)
                    .and_then(|bp| bp.children.iter().position(|c| *c == name));
                if let Some(parent) = self.nodes.get_mut(parent_path) {
                    if !parent.children.contains(&name) {
                        let idx = base_index
                            .unwrap_or(parent.children.len())
                            .min(parent.children.len());
                        parent.children.insert(idx, name);
                    }
                }
            }
        } else if let Some(parent) = parent_path.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != name);
        }
    }

    /// Paths of the subtree rooted at `node_path`, in document order.
    pub fn subtree_paths(&self, node_path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![node_path.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                for child in node.children.iter().rev() {
                    stack.push(path::join(&current, child));
                }
                out.push(current);
            }
        }
        out
    }

    /// Every path in the tree, in document order.
    pub fn walk(&self) -> Vec<String> {
        self.subtree_paths(path::ROOT)
    }
}
