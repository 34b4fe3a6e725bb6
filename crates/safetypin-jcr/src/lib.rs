//! safetypin-jcr: the repository capability the node layer is built on.
//!
//! The node, reconciliation and query layers never talk to a repository
//! directly; they go through the [`Session`] trait defined here. The crate
//! also ships [`MemoryRepository`], an in-memory implementation with
//! transient sessions, a JCR-SQL2 subset and JSON content snapshots.

pub mod error;
pub mod memory;
pub mod session;
pub mod value;

pub use error::RepositoryError;
pub use memory::{MemoryRepository, MemorySession};
pub use session::{Credentials, NodeStatus, Repository, Session};
pub use value::{JcrValue, PropertyData, PropertyDefinition, PropertyType, RemoteProperty};
