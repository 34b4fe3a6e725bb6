//! Integration tests for the in-memory repository through the `Session` trait.

use std::sync::Arc;

use serde_json::json;

use safetypin_jcr::{
    Credentials, JcrValue, MemoryRepository, PropertyData, Repository, RepositoryError, Session,
};

async fn login(repo: &MemoryRepository) -> Arc<dyn Session> {
    repo.login("http://localhost:4502/crx/server", &Credentials::new("admin", "admin"))
        .await
        .unwrap()
}

fn seeded() -> MemoryRepository {
    MemoryRepository::from_json(&json!({
        "content": {
            "jcr:primaryType": "sling:Folder",
            "site": {
                "jcr:primaryType": "cq:Page",
                "en": {"jcr:primaryType": "cq:Page", "title": "English"},
                "fr": {"jcr:primaryType": "cq:Page", "title": "Français"}
            }
        }
    }))
    .unwrap()
}

fn string(s: &str) -> PropertyData {
    PropertyData::Single(JcrValue::String(s.to_string()))
}

#[tokio::test]
async fn test_login_checks_credentials() {
    let repo = MemoryRepository::with_credentials("admin", "secret");
    let denied = repo
        .login("http://localhost:4502/crx/server", &Credentials::new("admin", "wrong"))
        .await;
    assert!(matches!(denied, Err(RepositoryError::Login(_))));

    let session = repo
        .login("http://localhost:4502/crx/server", &Credentials::new("admin", "secret"))
        .await
        .unwrap();
    assert_eq!(session.user_id(), "admin");
    assert!(session.is_live());
}

#[tokio::test]
async fn test_transient_changes_invisible_until_save() {
    let repo = seeded();
    let writer = login(&repo).await;
    let reader = login(&repo).await;

    writer.add_node("/content/site/de", "cq:Page").await.unwrap();
    assert!(writer.node_exists("/content/site/de").await.unwrap());
    let status = writer.node_status("/content/site/de").await.unwrap();
    assert!(status.is_new && status.is_modified);

    reader.refresh(false).await.unwrap();
    assert!(!reader.node_exists("/content/site/de").await.unwrap());

    writer.save().await.unwrap();
    let status = writer.node_status("/content/site/de").await.unwrap();
    assert!(!status.is_new && !status.is_modified);

    reader.refresh(false).await.unwrap();
    assert!(reader.node_exists("/content/site/de").await.unwrap());
}

#[tokio::test]
async fn test_add_node_requires_parent_and_free_path() {
    let repo = seeded();
    let session = login(&repo).await;

    assert_eq!(
        session.add_node("/nowhere/child", "nt:unstructured").await,
        Err(RepositoryError::PathNotFound("/nowhere".to_string()))
    );
    assert!(matches!(
        session.add_node("/content/site", "cq:Page").await,
        Err(RepositoryError::ItemExists(_))
    ));
}

#[tokio::test]
async fn test_shape_change_is_a_format_error() {
    let repo = seeded();
    let session = login(&repo).await;

    session
        .set_property("/content/site/en", "tags", PropertyData::Multiple(vec![JcrValue::String("a".into())]))
        .await
        .unwrap();
    let result = session.set_property("/content/site/en", "tags", string("b")).await;
    assert!(matches!(result, Err(RepositoryError::ValueFormat(_))));

    session.remove_property("/content/site/en", "tags").await.unwrap();
    session.set_property("/content/site/en", "tags", string("b")).await.unwrap();
    let prop = session.property("/content/site/en", "tags").await.unwrap();
    assert_eq!(prop.value().unwrap(), &JcrValue::String("b".into()));
}

#[tokio::test]
async fn test_protected_properties() {
    let repo = seeded();
    let session = login(&repo).await;

    let result = session
        .set_property("/content/site", "jcr:primaryType", string("nt:folder"))
        .await;
    assert!(matches!(result, Err(RepositoryError::ConstraintViolation(_))));

    session.add_mixin("/content/site", "mix:referenceable").await.unwrap();
    let props = session.properties("/content/site").await.unwrap();
    let protected: Vec<&str> = props
        .iter()
        .filter(|p| p.definition().protected)
        .map(|p| p.name())
        .collect();
    assert_eq!(protected, vec!["jcr:primaryType", "jcr:mixinTypes", "jcr:uuid"]);
}

#[tokio::test]
async fn test_locked_node_refuses_removal() {
    let repo = seeded();
    repo.lock("/content/site/en");
    let session = login(&repo).await;

    let result = session.remove_node("/content/site").await;
    assert_eq!(result, Err(RepositoryError::Locked("/content/site/en".to_string())));
    assert!(session.node_exists("/content/site/en").await.unwrap());

    repo.unlock("/content/site/en");
    session.remove_node("/content/site").await.unwrap();
    assert!(!session.node_exists("/content/site/en").await.unwrap());
}

#[tokio::test]
async fn test_refresh_node_discards_subtree_changes() {
    let repo = seeded();
    let session = login(&repo).await;

    session.set_property("/content/site/en", "title", string("Changed")).await.unwrap();
    session.set_property("/content/site/fr", "title", string("Changé")).await.unwrap();
    session.refresh_node("/content/site/en", false).await.unwrap();

    let en = session.property("/content/site/en", "title").await.unwrap();
    assert_eq!(en.value().unwrap(), &JcrValue::String("English".into()));
    assert!(session.node_status("/content/site/fr").await.unwrap().is_modified);
}

#[tokio::test]
async fn test_move_and_order() {
    let repo = seeded();
    let session = login(&repo).await;

    session.order_before("/content/site", "fr", Some("en")).await.unwrap();
    assert_eq!(session.child_names("/content/site").await.unwrap(), vec!["fr", "en"]);

    session.move_node("/content/site/fr", "/content/fr").await.unwrap();
    assert_eq!(session.child_names("/content").await.unwrap(), vec!["site", "fr"]);
    assert_eq!(session.primary_type("/content/fr").await.unwrap(), "cq:Page");

    let result = session.move_node("/content/site", "/content/site/en/site").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_queries_see_saved_content_in_document_order() {
    let repo = seeded();
    let session = login(&repo).await;

    let pages = session
        .execute_query("SELECT * FROM [cq:Page]", "JCR-SQL2")
        .await
        .unwrap();
    assert_eq!(pages, vec!["/content/site", "/content/site/en", "/content/site/fr"]);

    session.add_node("/content/site/de", "cq:Page").await.unwrap();
    let pages = session
        .execute_query("SELECT * FROM [cq:Page] WHERE [jcr:path] LIKE '/content/site/%'", "JCR-SQL2")
        .await
        .unwrap();
    assert_eq!(pages.len(), 2);

    let result = session.execute_query("//element(*, cq:Page)", "xpath").await;
    assert!(matches!(result, Err(RepositoryError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_closed_session_rejects_calls() {
    let repo = seeded();
    let session = login(&repo).await;
    session.logout().await.unwrap();
    assert!(!session.is_live());
    assert_eq!(
        session.node_exists("/content").await,
        Err(RepositoryError::SessionClosed)
    );
}

#[tokio::test]
async fn test_snapshot_export_after_save() {
    let repo = MemoryRepository::new();
    let session = login(&repo).await;
    session.add_node("/content", "nt:unstructured").await.unwrap();
    session.set_property("/content", "title", string("Home")).await.unwrap();
    session.save().await.unwrap();

    assert_eq!(
        repo.to_json("/content").unwrap(),
        json!({"jcr:primaryType": "nt:unstructured", "title": "Home"})
    );
}
