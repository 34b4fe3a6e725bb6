#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use safetypin::{Jcr, JcrConfig};
use safetypin_jcr::{
    MemoryRepository, NodeStatus, PropertyData, RemoteProperty, Repository, RepositoryError,
    Session,
};
use serde_json::json;

/// A small site: /content/site with two pages, each with page content.
pub fn site() -> serde_json::Value {
    json!({
        "content": {
            "jcr:primaryType": "sling:Folder",
            "site": {
                "jcr:primaryType": "cq:Page",
                "en": {
                    "jcr:primaryType": "cq:Page",
                    "jcr:content": {
                        "jcr:primaryType": "cq:PageContent",
                        "jcr:title": "English",
                        "sling:resourceType": "site/components/page"
                    }
                },
                "fr": {
                    "jcr:primaryType": "cq:Page",
                    "jcr:content": {
                        "jcr:primaryType": "cq:PageContent",
                        "jcr:title": "Français",
                        "sling:resourceType": "site/components/page"
                    }
                }
            }
        }
    })
}

pub async fn login(repo: &MemoryRepository) -> Jcr {
    Jcr::login(repo, &JcrConfig::default()).await.unwrap()
}

pub async fn seeded() -> (MemoryRepository, Jcr) {
    let repo = MemoryRepository::from_json(&site()).unwrap();
    let jcr = login(&repo).await;
    (repo, jcr)
}

pub fn paths(nodes: &[safetypin::Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.path()).collect()
}

/// A session that stages changes normally but refuses every save.
pub struct RejectingSave {
    inner: Arc<dyn Session>,
    reason: String,
}

impl RejectingSave {
    pub async fn login(repo: &MemoryRepository, reason: &str) -> Jcr {
        let inner = repo
            .login("http://localhost:4502/crx/server", &safetypin_jcr::Credentials::new("admin", "admin"))
            .await
            .unwrap();
        let session = Arc::new(Self {
            inner,
            reason: reason.to_string(),
        });
        Jcr::from_session(session, JcrConfig::default())
    }
}

type SessionResult<T> = Result<T, RepositoryError>;

#[async_trait]
impl Session for RejectingSave {
    fn user_id(&self) -> &str {
        self.inner.user_id()
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    async fn logout(&self) -> SessionResult<()> {
        self.inner.logout().await
    }

    async fn save(&self) -> SessionResult<()> {
        Err(RepositoryError::ConstraintViolation(self.reason.clone()))
    }

    async fn refresh(&self, keep_changes: bool) -> SessionResult<()> {
        self.inner.refresh(keep_changes).await
    }

    async fn node_exists(&self, path: &str) -> SessionResult<bool> {
        self.inner.node_exists(path).await
    }

    async fn primary_type(&self, path: &str) -> SessionResult<String> {
        self.inner.primary_type(path).await
    }

    async fn node_status(&self, path: &str) -> SessionResult<NodeStatus> {
        self.inner.node_status(path).await
    }

    async fn child_names(&self, path: &str) -> SessionResult<Vec<String>> {
        self.inner.child_names(path).await
    }

    async fn add_node(&self, path: &str, primary_type: &str) -> SessionResult<()> {
        self.inner.add_node(path, primary_type).await
    }

    async fn remove_node(&self, path: &str) -> SessionResult<()> {
        self.inner.remove_node(path).await
    }

    async fn move_node(&self, src_path: &str, dest_path: &str) -> SessionResult<()> {
        self.inner.move_node(src_path, dest_path).await
    }

    async fn order_before(
        &self,
        parent_path: &str,
        src_name: &str,
        dest_name: Option<&str>,
    ) -> SessionResult<()> {
        self.inner.order_before(parent_path, src_name, dest_name).await
    }

    async fn refresh_node(&self, path: &str, keep_changes: bool) -> SessionResult<()> {
        self.inner.refresh_node(path, keep_changes).await
    }

    async fn set_primary_type(&self, path: &str, primary_type: &str) -> SessionResult<()> {
        self.inner.set_primary_type(path, primary_type).await
    }

    async fn mixin_types(&self, path: &str) -> SessionResult<Vec<String>> {
        self.inner.mixin_types(path).await
    }

    async fn add_mixin(&self, path: &str, mixin: &str) -> SessionResult<()> {
        self.inner.add_mixin(path, mixin).await
    }

    async fn remove_mixin(&self, path: &str, mixin: &str) -> SessionResult<()> {
        self.inner.remove_mixin(path, mixin).await
    }

    async fn property(&self, path: &str, name: &str) -> SessionResult<RemoteProperty> {
        self.inner.property(path, name).await
    }

    async fn properties(&self, path: &str) -> SessionResult<Vec<RemoteProperty>> {
        self.inner.properties(path).await
    }

    async fn set_property(&self, path: &str, name: &str, data: PropertyData) -> SessionResult<()> {
        self.inner.set_property(path, name, data).await
    }

    async fn remove_property(&self, path: &str, name: &str) -> SessionResult<()> {
        self.inner.remove_property(path, name).await
    }

    async fn execute_query(&self, statement: &str, language: &str) -> SessionResult<Vec<String>> {
        self.inner.execute_query(statement, language).await
    }
}
