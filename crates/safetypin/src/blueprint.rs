//! Declarative descriptions of desired node state.

use std::collections::BTreeMap;

use safetypin_core::{NT_UNSTRUCTURED, PRIMARY_TYPE};

use crate::error::{Error, Result};
use crate::value::Value;

/// One desired entry: a property value or a nested child node.
#[derive(Debug, Clone, PartialEq)]
pub enum BlueprintProperty {
    Value(Value),
    Child(NodeBlueprint),
}

impl<T: Into<Value>> From<T> for BlueprintProperty {
    fn from(value: T) -> Self {
        Self::Value(value.into())
    }
}

impl From<NodeBlueprint> for BlueprintProperty {
    fn from(child: NodeBlueprint) -> Self {
        Self::Child(child)
    }
}

/// Desired properties by name.
pub type Properties = BTreeMap<String, BlueprintProperty>;

/// A node as it should be: path, primary type, and properties (which may
/// themselves be nested child blueprints).
///
/// Blueprints are values; applying one is the reconciler's job.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlueprint {
    path: Option<String>,
    primary_type: String,
    properties: Properties,
}

impl NodeBlueprint {
    /// A blueprint for the node at `path`, typed `nt:unstructured`.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::NodeBlueprint("No path specified".into()));
        }
        Ok(Self {
            path: Some(path),
            ..Self::pathless()
        })
    }

    /// A nested child descriptor; its path comes from where it is applied.
    pub fn pathless() -> Self {
        Self {
            path: None,
            primary_type: NT_UNSTRUCTURED.to_string(),
            properties: Properties::new(),
        }
    }

    pub fn with_primary_type(mut self, primary_type: impl Into<String>) -> Self {
        self.primary_type = primary_type.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .insert(name.into(), BlueprintProperty::Value(value.into()));
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: NodeBlueprint) -> Self {
        self.properties
            .insert(name.into(), BlueprintProperty::Child(child));
        self
    }

    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<BlueprintProperty>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build from a JSON object. Nested objects become child blueprints and
    /// a `jcr:primaryType` key sets the type.
    ///
    /// ```
    /// # use safetypin::NodeBlueprint;
    /// let bp = NodeBlueprint::from_json(
    ///     Some("/content/page"),
    ///     &serde_json::json!({"jcr:primaryType": "cq:Page", "title": "Home", "jcr:content": {}}),
    /// )
    /// .unwrap();
    /// assert_eq!(bp.primary_type(), "cq:Page");
    /// assert_eq!(bp.properties().len(), 2);
    /// ```
    pub fn from_json(path: Option<&str>, json: &serde_json::Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::NodeBlueprint("blueprint JSON must be an object".into()))?;
        let mut blueprint = match path {
            Some(p) => Self::new(p)?,
            None => Self::pathless(),
        };
        for (key, value) in object {
            if key == PRIMARY_TYPE {
                let primary_type = value.as_str().ok_or_else(|| {
                    Error::NodeBlueprint(format!("{PRIMARY_TYPE} must be a string"))
                })?;
                blueprint.primary_type = primary_type.to_string();
            } else if value.is_object() {
                let child = Self::from_json(None, value)?;
                blueprint = blueprint.with_child(key.as_str(), child);
            } else {
                blueprint = blueprint.with_property(key.as_str(), Value::try_from(value)?);
            }
        }
        Ok(blueprint)
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_pathless(&self) -> bool {
        self.path.is_none()
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The same description addressed at `path`.
    pub(crate) fn at(&self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self.clone()
        }
    }
}

/// What `build` and `create` accept: a bare path or a full blueprint.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildTarget {
    PathOnly(String),
    Blueprint(NodeBlueprint),
}

impl BuildTarget {
    pub fn into_blueprint(self) -> Result<NodeBlueprint> {
        match self {
            Self::PathOnly(path) => NodeBlueprint::new(path),
            Self::Blueprint(blueprint) => Ok(blueprint),
        }
    }
}

impl From<&str> for BuildTarget {
    fn from(path: &str) -> Self {
        Self::PathOnly(path.to_string())
    }
}

impl From<String> for BuildTarget {
    fn from(path: String) -> Self {
        Self::PathOnly(path)
    }
}

impl From<NodeBlueprint> for BuildTarget {
    fn from(blueprint: NodeBlueprint) -> Self {
        Self::Blueprint(blueprint)
    }
}
