//! Error types for the safetypin crate.
//!
//! `find` answers absence with `None`; `read_attribute` answers it with
//! [`Error::NilProperty`]. Callers branch on the variant, so the kinds stay
//! distinct rather than collapsing into one repository failure.

use thiserror::Error;

use safetypin_jcr::RepositoryError;

#[derive(Error, Debug)]
pub enum Error {
    /// A path argument that is not absolute. Programmer error.
    #[error("Invalid path (must be absolute): {0}")]
    InvalidPath(String),

    /// Any other broken input contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Structural conflict: occupied path, missing ancestor, bad sibling, failed removal.
    #[error("{message}")]
    Node {
        message: String,
        #[source]
        source: Option<RepositoryError>,
    },

    #[error("{0}")]
    PropertyType(String),

    #[error("{0} property not found on node")]
    NilProperty(String),

    /// Illegal mutation of a protected property.
    #[error("Illegal operation: {0}")]
    Property(String),

    #[error("Invalid node blueprint: {0}")]
    NodeBlueprint(String),

    #[error("Search query failed: {0}")]
    QueryBuilder(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] safetypin_core::CoreError),
}

impl Error {
    pub(crate) fn node(message: impl Into<String>) -> Self {
        Self::Node {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn node_caused_by(message: impl Into<String>, source: RepositoryError) -> Self {
        Self::Node {
            message: message.into(),
            source: Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
