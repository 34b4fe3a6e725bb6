//! JSON content snapshots for the in-memory repository.
//!
//! The format follows the usual content-export shape: a JSON object is a
//! node, its `jcr:primaryType` / `jcr:mixinTypes` keys set the node types,
//! nested objects are child nodes, and every other key is a property.
//! Keys starting with `:` are export metadata and are skipped on import.
//!
//! ```json
//! {
//!   "content": {
//!     "jcr:primaryType": "cq:Page",
//!     "title": "Home",
//!     "tags": ["a", "b"]
//!   }
//! }
//! ```
//!
//! Export is lossy for binaries (written as `":name": <length>`) and for
//! dates, decimals, names and paths (written as strings).

use serde_json::{Map, Number, Value};

use safetypin_core::{path, MIXIN_TYPES, NT_UNSTRUCTURED, PRIMARY_TYPE};

use super::tree::Tree;
use crate::error::{RepositoryError, Result};
use crate::value::{JcrValue, PropertyData};

/// Build a tree from a snapshot of the root node.
pub(crate) fn import(root: &Value) -> Result<Tree> {
    let object = root
        .as_object()
        .ok_or_else(|| RepositoryError::ValueFormat("snapshot root must be an object".into()))?;
    let mut tree = Tree::new();
    import_node(&mut tree, path::ROOT, object)?;
    Ok(tree)
}

fn import_node(tree: &mut Tree, node_path: &str, object: &Map<String, Value>) -> Result<()> {
    if let Some(primary_type) = object.get(PRIMARY_TYPE).and_then(Value::as_str) {
        tree.node_mut(node_path)?.primary_type = primary_type.to_string();
    }
    if let Some(mixins) = object.get(MIXIN_TYPES).and_then(Value::as_array) {
        tree.node_mut(node_path)?.mixins = mixins
            .iter()
            .filter_map(|m| m.as_str().map(str::to_string))
            .collect();
    }

    for (key, value) in object {
        if key.starts_with(':') || key == PRIMARY_TYPE || key == MIXIN_TYPES {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Object(child) => {
                let child_path = path::join(node_path, key);
                tree.add(&child_path, NT_UNSTRUCTURED)?;
                import_node(tree, &child_path, child)?;
            }
            other => {
                let data = json_to_data(key, other)?;
                tree.node_mut(node_path)?
                    .properties
                    .insert(key.clone(), data);
            }
        }
    }
    Ok(())
}

fn json_to_data(name: &str, value: &Value) -> Result<PropertyData> {
    match value {
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| json_to_scalar(name, item))
                .collect::<Result<Vec<_>>>()?;
            let data = PropertyData::Multiple(values);
            if !data.is_homogeneous() {
                return Err(RepositoryError::ValueFormat(format!(
                    "mixed value types in property {name}"
                )));
            }
            Ok(data)
        }
        scalar => Ok(PropertyData::Single(json_to_scalar(name, scalar)?)),
    }
}

fn json_to_scalar(name: &str, value: &Value) -> Result<JcrValue> {
    match value {
        Value::String(s) => Ok(JcrValue::String(s.clone())),
        Value::Bool(b) => Ok(JcrValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(JcrValue::Long(i)),
            None => n.as_f64().map(JcrValue::Double).ok_or_else(|| {
                RepositoryError::ValueFormat(format!("unrepresentable number in {name}"))
            }),
        },
        _ => Err(RepositoryError::ValueFormat(format!(
            "unsupported value for property {name}"
        ))),
    }
}

/// Export the subtree at `node_path`.
pub(crate) fn export(tree: &Tree, node_path: &str) -> Result<Value> {
    let node = tree.node(node_path)?;
    let mut object = Map::new();
    object.insert(
        PRIMARY_TYPE.to_string(),
        Value::String(node.primary_type.clone()),
    );
    if !node.mixins.is_empty() {
        object.insert(
            MIXIN_TYPES.to_string(),
            Value::Array(node.mixins.iter().cloned().map(Value::String).collect()),
        );
    }
    for (name, data) in &node.properties {
        match data {
            PropertyData::Single(JcrValue::Binary(bytes)) => {
                object.insert(format!(":{name}"), Value::from(bytes.len()));
            }
            PropertyData::Single(v) => {
                object.insert(name.clone(), scalar_to_json(v));
            }
            PropertyData::Multiple(values) => {
                object.insert(
                    name.clone(),
                    Value::Array(values.iter().map(scalar_to_json).collect()),
                );
            }
        }
    }
    for child in &node.children {
        let child_path = path::join(node_path, child);
        object.insert(child.clone(), export(tree, &child_path)?);
    }
    Ok(Value::Object(object))
}

fn scalar_to_json(value: &JcrValue) -> Value {
    match value {
        JcrValue::Long(n) => Value::from(*n),
        JcrValue::Double(d) => Number::from_f64(*d)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(d.to_string())),
        JcrValue::Boolean(b) => Value::Bool(*b),
        other => Value::String(other.lexical()),
    }
}
