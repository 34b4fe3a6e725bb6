//! Errors reported by a repository session.

use thiserror::Error;

/// Failures surfaced by the remote repository.
///
/// Variants follow the exception families of the repository API so callers
/// can branch on the cause (missing path vs. occupied path vs. bad format).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Item already exists: {0}")]
    ItemExists(String),

    #[error("Value format error: {0}")]
    ValueFormat(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Node is locked: {0}")]
    Locked(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Session is no longer live")]
    SessionClosed,

    #[error("Repository error: {0}")]
    Repository(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
