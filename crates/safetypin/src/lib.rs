//! safetypin: a client layer over a JCR-style content repository.
//!
//! - [`Node`] handles with typed property access, navigation and structural edits
//! - [`NodeBlueprint`]s applied by the reconciler (`build`, `create`, `update`,
//!   `create_or_update`, `set_properties`)
//! - [`Query`] for JCR-SQL2 and [`QueryBuilder`] for the HTTP search service
//!
//! Everything goes through an explicit [`Jcr`] session handle:
//!
//! ```no_run
//! # async fn demo() -> safetypin::Result<()> {
//! use safetypin::{Jcr, JcrConfig, Node, NodeBlueprint, Value};
//! use safetypin_jcr::MemoryRepository;
//!
//! let jcr = Jcr::login(&MemoryRepository::new(), &JcrConfig::default()).await?;
//! let page = Node::create(
//!     &jcr,
//!     NodeBlueprint::new("/content")?.with_property("title", "Home"),
//! )
//! .await?;
//! assert_eq!(page.get("title").await?, Value::from("Home"));
//! # Ok(())
//! # }
//! ```

pub mod blueprint;
pub mod codec;
pub mod error;
pub mod jcr;
pub mod node;
pub mod query;
mod reconcile;
pub mod replace;
pub mod search;
pub mod value;

pub use blueprint::{BlueprintProperty, BuildTarget, NodeBlueprint, Properties};
pub use error::{Error, Result};
pub use jcr::Jcr;
pub use node::Node;
pub use query::{Comparator, Query, WhereCondition, WithinPaths};
pub use replace::{PropertyReplacement, Replacement};
pub use search::QueryBuilder;
pub use value::{Decimal, Value};

pub use safetypin_core::JcrConfig;
