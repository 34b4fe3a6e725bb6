//! JCR-SQL2 queries: raw statements and a small fluent builder.
//!
//! ```
//! # use safetypin::Query;
//! let query = Query::new()
//!     .of_type("cq:Page")
//!     .where_equal([("sling:resourceType", "foundation/components/text")])
//!     .within("/content/");
//! assert_eq!(
//!     query.sql(),
//!     "SELECT * FROM [cq:Page] WHERE [sling:resourceType] = 'foundation/components/text' \
//!      AND [jcr:path] LIKE '/content/%'"
//! );
//! ```
//!
//! The builder emits syntax only. Literal values are not escaped, so a value
//! containing `'` produces a broken (or different) statement.

mod where_condition;

pub use where_condition::{Comparator, WhereCondition};

use tracing::debug;

use safetypin_core::{JCR_PATH, JCR_SQL2, NT_BASE};

use crate::error::Result;
use crate::jcr::Jcr;
use crate::node::Node;
use crate::value::Value;

/// Paths accepted by [`Query::within`]. JSON input that is neither a string
/// nor an array contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithinPaths(Vec<String>);

impl From<&str> for WithinPaths {
    fn from(path: &str) -> Self {
        Self(vec![path.to_string()])
    }
}

impl From<String> for WithinPaths {
    fn from(path: String) -> Self {
        Self(vec![path])
    }
}

impl From<Vec<String>> for WithinPaths {
    fn from(paths: Vec<String>) -> Self {
        Self(paths)
    }
}

impl From<Vec<&str>> for WithinPaths {
    fn from(paths: Vec<&str>) -> Self {
        Self(paths.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for WithinPaths {
    fn from(paths: [&str; N]) -> Self {
        Self(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl From<&serde_json::Value> for WithinPaths {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::String(path) => Self(vec![path.clone()]),
            serde_json::Value::Array(items) => Self(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }
}

/// Fluent JCR-SQL2 builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    node_type: Option<String>,
    where_conditions: Vec<WhereCondition>,
    within: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector type. The last call wins; unset means `nt:base`.
    pub fn of_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    /// Append one equality condition per pair, in iteration order.
    pub fn where_equal<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.where_conditions.extend(
            properties
                .into_iter()
                .map(|(name, value)| WhereCondition::equal(name, value.into().to_string())),
        );
        self
    }

    /// Append an arbitrary condition.
    pub fn where_condition(mut self, condition: WhereCondition) -> Self {
        self.where_conditions.push(condition);
        self
    }

    /// Restrict results to paths beginning with each given prefix.
    pub fn within(mut self, paths: impl Into<WithinPaths>) -> Self {
        self.within.extend(paths.into().0);
        self
    }

    pub fn where_conditions(&self) -> &[WhereCondition] {
        &self.where_conditions
    }

    pub fn sql(&self) -> String {
        let select = format!(
            "SELECT * FROM [{}]",
            self.node_type.as_deref().unwrap_or(NT_BASE)
        );
        let fragments: Vec<String> = self
            .where_conditions
            .iter()
            .cloned()
            .chain(self.within_conditions())
            .map(|c| c.sql_fragment())
            .collect();
        if fragments.is_empty() {
            select
        } else {
            format!("{select} WHERE {}", fragments.join(" AND "))
        }
    }

    fn within_conditions(&self) -> impl Iterator<Item = WhereCondition> + '_ {
        self.within
            .iter()
            .map(|p| WhereCondition::new(JCR_PATH, format!("{p}%"), Comparator::Like))
    }

    pub async fn execute(&self, jcr: &Jcr) -> Result<Vec<Node>> {
        Self::execute_sql(jcr, &self.sql()).await
    }

    /// Run a raw JCR-SQL2 statement; nodes come back in result order.
    pub async fn execute_sql(jcr: &Jcr, statement: &str) -> Result<Vec<Node>> {
        let paths = jcr.session().execute_query(statement, JCR_SQL2).await?;
        debug!(statement, hits = paths.len(), "Query executed");
        Ok(paths.into_iter().map(|p| Node::attach(jcr, p)).collect())
    }
}
