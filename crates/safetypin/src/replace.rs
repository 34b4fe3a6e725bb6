//! Pattern-driven property rewrites across a subtree.

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::value::Value;

type ReplaceFn = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// What a matched property becomes.
pub enum Replacement {
    /// A fixed new value.
    Value(Value),
    /// Computed from the old value.
    With(ReplaceFn),
}

impl std::fmt::Debug for Replacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// A rewrite rule: properties whose name matches `name` and whose string
/// value matches `target` get the replacement.
#[derive(Debug)]
pub struct PropertyReplacement {
    name: Regex,
    target: Regex,
    replacement: Option<Replacement>,
}

impl PropertyReplacement {
    /// Both patterns are required; an invalid pattern is [`Error::InvalidArgument`].
    pub fn new(name_pattern: &str, target_pattern: &str) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::InvalidArgument(format!("invalid pattern {pattern:?}: {e}")))
        };
        Ok(Self {
            name: compile(name_pattern)?,
            target: compile(target_pattern)?,
            replacement: None,
        })
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.replacement = Some(Replacement::Value(value.into()));
        self
    }

    pub fn with_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.replacement = Some(Replacement::With(Box::new(f)));
        self
    }

    fn replacement_for(&self, old: &Value) -> Result<Value> {
        match &self.replacement {
            Some(Replacement::Value(v)) => Ok(v.clone()),
            Some(Replacement::With(f)) => Ok(f(old)),
            None => Err(Error::InvalidArgument(
                "a replacement value or function is required".into(),
            )),
        }
    }

    fn matches(&self, name: &str, value: &Value) -> bool {
        self.name.is_match(name) && value.as_str().is_some_and(|s| self.target.is_match(s))
    }
}

impl Node {
    /// Rewrite every matching property on this node (and, if `recursive`,
    /// its descendants). Returns the nodes that changed; nothing is saved.
    pub async fn replace_property(
        &self,
        replacement: &PropertyReplacement,
        recursive: bool,
    ) -> Result<Vec<Node>> {
        if replacement.replacement.is_none() {
            return Err(Error::InvalidArgument(
                "a replacement value or function is required".into(),
            ));
        }

        let mut targets = vec![self.clone()];
        if recursive {
            targets.extend(self.descendants().await?);
        }

        let mut modified = Vec::new();
        for node in targets {
            let mut changed = false;
            for name in node.property_names().await? {
                if !replacement.name.is_match(&name) {
                    continue;
                }
                let old = match node.read_attribute(&name).await {
                    Ok(v) => v,
                    Err(Error::PropertyType(_)) => continue,
                    Err(e) => return Err(e),
                };
                if !replacement.matches(&name, &old) {
                    continue;
                }
                let new = replacement.replacement_for(&old)?;
                node.write_attribute(&name, Some(new)).await?;
                debug!(path = %node.path(), property = %name, "Replaced property");
                changed = true;
            }
            if changed {
                modified.push(node);
            }
        }
        Ok(modified)
    }
}
