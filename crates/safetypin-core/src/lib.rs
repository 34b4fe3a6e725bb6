//! safetypin-core: Shared building blocks for the safetypin JCR toolkit.
//!
//! This crate provides the pieces every other safetypin crate agrees on:
//! - Repository-wide names (`jcr:primaryType`, default node types, ...)
//! - Absolute path handling for the content tree
//! - Connection configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod path;

pub use config::JcrConfig;
pub use error::CoreError;

/// Property holding a node's primary type.
pub const PRIMARY_TYPE: &str = "jcr:primaryType";

/// Property holding a node's mixin types.
pub const MIXIN_TYPES: &str = "jcr:mixinTypes";

/// Identifier property assigned to referenceable nodes.
pub const UUID: &str = "jcr:uuid";

/// Pseudo-property queries use to match on node paths.
pub const JCR_PATH: &str = "jcr:path";

/// Primary type given to nodes created without an explicit type.
pub const NT_UNSTRUCTURED: &str = "nt:unstructured";

/// Base type every node type inherits from; the default query selector.
pub const NT_BASE: &str = "nt:base";

/// Primary type of the root node.
pub const REP_ROOT: &str = "rep:root";

/// Mixin that makes a node referenceable (gives it a `jcr:uuid`).
pub const MIX_REFERENCEABLE: &str = "mix:referenceable";

/// Query language name understood by the repository query manager.
pub const JCR_SQL2: &str = "JCR-SQL2";
