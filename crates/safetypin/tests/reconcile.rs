mod common;

use std::collections::BTreeMap;

use safetypin::{BlueprintProperty, Error, Node, NodeBlueprint, Value};
use safetypin_jcr::RepositoryError;
use serde_json::json;

use common::{login, paths, seeded};

#[tokio::test]
async fn test_build_stages_without_saving() {
    let (repo, jcr) = seeded().await;
    let node = Node::build(
        &jcr,
        NodeBlueprint::new("/content/site/de")
            .unwrap()
            .with_primary_type("cq:Page")
            .with_property("hideInNav", true),
    )
    .await
    .unwrap();

    assert!(node.is_new().await.unwrap());
    assert_eq!(node.primary_type().await.unwrap(), "cq:Page");
    assert_eq!(node.get("hideInNav").await.unwrap(), Value::Boolean(true));

    let other = login(&repo).await;
    assert!(!Node::exists(&other, "/content/site/de").await.unwrap());

    assert!(node.save().await.unwrap());
    other.refresh(false).await.unwrap();
    assert!(Node::exists(&other, "/content/site/de").await.unwrap());
}

#[tokio::test]
async fn test_build_never_overwrites() {
    let (_repo, jcr) = seeded().await;
    let result = Node::build(
        &jcr,
        NodeBlueprint::new("/content/site/en").unwrap().with_property("x", 1),
    )
    .await;
    assert!(matches!(result, Err(Error::Node { source: None, .. })));

    let en = Node::find(&jcr, "/content/site/en").await.unwrap().unwrap();
    assert!(matches!(en.get("x").await, Err(Error::NilProperty(_))));
    assert_eq!(en.primary_type().await.unwrap(), "cq:Page");
}

#[tokio::test]
async fn test_build_requires_existing_ancestors() {
    let (_repo, jcr) = seeded().await;
    let err = Node::build(&jcr, "/content/missing/child").await.unwrap_err();
    match err {
        Error::Node { source, .. } => {
            assert!(matches!(source, Some(RepositoryError::PathNotFound(_))));
        }
        other => panic!("expected a node error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_build_argument_contracts() {
    let (_repo, jcr) = seeded().await;
    assert!(matches!(
        Node::build(&jcr, "content/relative").await,
        Err(Error::Node { .. })
    ));
    assert!(matches!(
        Node::build(&jcr, NodeBlueprint::pathless()).await,
        Err(Error::NodeBlueprint(_))
    ));
}

#[tokio::test]
async fn test_create_persists() {
    let (repo, jcr) = seeded().await;
    let node = Node::create(&jcr, "/content/site/de").await.unwrap();
    assert!(!node.is_new().await.unwrap());
    assert_eq!(node.primary_type().await.unwrap(), "nt:unstructured");

    let other = login(&repo).await;
    assert!(Node::exists(&other, "/content/site/de").await.unwrap());
}

#[tokio::test]
async fn test_set_properties_is_full_replace() {
    let (_repo, jcr) = seeded().await;
    let node = Node::create(
        &jcr,
        NodeBlueprint::new("/content/props")
            .unwrap()
            .with_property("a", 1)
            .with_property("b", 2),
    )
    .await
    .unwrap();

    node.set_properties([("b", 3), ("c", 4)]).await.unwrap();

    assert_eq!(
        node.properties().await.unwrap(),
        BTreeMap::from([
            ("b".to_string(), Value::Long(3)),
            ("c".to_string(), Value::Long(4)),
        ])
    );
}

#[tokio::test]
async fn test_nested_child_replaces_same_named_value() {
    let (_repo, jcr) = seeded().await;
    let node = Node::create(
        &jcr,
        NodeBlueprint::new("/content/p").unwrap().with_property("x", "old"),
    )
    .await
    .unwrap();

    node.set_properties([("x", BlueprintProperty::from(NodeBlueprint::pathless()))])
        .await
        .unwrap();

    assert!(node.properties().await.unwrap().is_empty());
    assert!(node.child("x").await.unwrap().is_some());
}

#[tokio::test]
async fn test_set_properties_handles_shape_changes() {
    let (_repo, jcr) = seeded().await;
    let node = Node::create(
        &jcr,
        NodeBlueprint::new("/content/props")
            .unwrap()
            .with_property("tags", vec!["a"])
            .with_property("title", "t"),
    )
    .await
    .unwrap();

    node.set_properties([
        ("tags", Value::from("single")),
        ("title", Value::from(vec!["x", "y"])),
    ])
    .await
    .unwrap();

    let props = node.properties().await.unwrap();
    assert_eq!(props["tags"], Value::from("single"));
    assert_eq!(props["title"], Value::from(vec!["x", "y"]));
}

#[tokio::test]
async fn test_nested_blueprints_stage_or_update_children() {
    let (_repo, jcr) = seeded().await;
    let page = Node::find(&jcr, "/content/site/en").await.unwrap().unwrap();

    page.set_properties([
        (
            "jcr:content",
            BlueprintProperty::from(
                NodeBlueprint::pathless()
                    .with_primary_type("cq:PageContent")
                    .with_property("jcr:title", "Updated"),
            ),
        ),
        (
            "teaser",
            BlueprintProperty::from(NodeBlueprint::pathless().with_property("text", "Hi")),
        ),
        ("hideInNav", BlueprintProperty::from(true)),
    ])
    .await
    .unwrap();

    let content = page.child("jcr:content").await.unwrap().unwrap();
    assert_eq!(content.properties().await.unwrap(), BTreeMap::from([
        ("jcr:title".to_string(), Value::from("Updated")),
    ]));
    assert!(content.is_changed().await.unwrap());

    let teaser = page.child("teaser").await.unwrap().unwrap();
    assert!(teaser.is_new().await.unwrap());
    assert_eq!(teaser.get("text").await.unwrap(), Value::from("Hi"));

    assert_eq!(page.get("hideInNav").await.unwrap(), Value::Boolean(true));

    page.save().await.unwrap();
    assert!(!teaser.is_new().await.unwrap());
}

#[tokio::test]
async fn test_update_applies_properties_and_type() {
    let (repo, jcr) = seeded().await;
    let blueprint = NodeBlueprint::from_json(
        Some("/content/site/fr/jcr:content"),
        &json!({
            "jcr:primaryType": "nt:unstructured",
            "jcr:title": "Français (mis à jour)"
        }),
    )
    .unwrap();

    let node = Node::update(&jcr, &blueprint).await.unwrap();
    assert!(!node.is_changed().await.unwrap());

    let other = login(&repo).await;
    let seen = Node::find(&other, "/content/site/fr/jcr:content").await.unwrap().unwrap();
    assert_eq!(seen.primary_type().await.unwrap(), "nt:unstructured");
    assert_eq!(
        seen.properties().await.unwrap(),
        BTreeMap::from([("jcr:title".to_string(), Value::from("Français (mis à jour)"))])
    );
}

#[tokio::test]
async fn test_update_requires_existing_node() {
    let (_repo, jcr) = seeded().await;
    let blueprint = NodeBlueprint::new("/content/nowhere").unwrap();
    assert!(matches!(
        Node::update(&jcr, &blueprint).await,
        Err(Error::Node { .. })
    ));
}

#[tokio::test]
async fn test_create_or_update_dispatches_per_blueprint() {
    let (_repo, jcr) = seeded().await;
    let nodes = Node::create_or_update(
        &jcr,
        [
            NodeBlueprint::new("/content/site/en")
                .unwrap()
                .with_primary_type("cq:Page")
                .with_property("hideInNav", true),
            NodeBlueprint::new("/content/site/it")
                .unwrap()
                .with_primary_type("cq:Page"),
        ],
    )
    .await
    .unwrap();

    assert_eq!(paths(&nodes), vec!["/content/site/en", "/content/site/it"]);
    assert_eq!(nodes[0].get("hideInNav").await.unwrap(), Value::Boolean(true));
    assert!(!nodes[1].is_new().await.unwrap());
    assert_eq!(nodes[1].primary_type().await.unwrap(), "cq:Page");
}

#[tokio::test]
async fn test_create_or_update_rejects_relative_paths_like_build() {
    let (_repo, jcr) = seeded().await;
    let result = Node::create_or_update(&jcr, [NodeBlueprint::new("content/rel").unwrap()]).await;
    assert!(matches!(result, Err(Error::Node { .. })));
}

#[tokio::test]
async fn test_create_parents_outermost_first() {
    let (repo, jcr) = seeded().await;
    Node::create_parents(&jcr, "/content/a/b/c").await.unwrap();

    let other = login(&repo).await;
    assert!(Node::exists(&other, "/content/a").await.unwrap());
    assert!(Node::exists(&other, "/content/a/b").await.unwrap());
    assert!(!Node::exists(&other, "/content/a/b/c").await.unwrap());
    let b = Node::find(&other, "/content/a/b").await.unwrap().unwrap();
    assert_eq!(b.primary_type().await.unwrap(), "nt:unstructured");

    // Nothing missing: a no-op.
    Node::create_parents(&jcr, "/content/site/en").await.unwrap();
}

#[tokio::test]
async fn test_find_or_create() {
    let (_repo, jcr) = seeded().await;
    let existing = Node::find_or_create(&jcr, "/content/site", Some("nt:folder")).await.unwrap();
    assert_eq!(existing.primary_type().await.unwrap(), "cq:Page");

    let created = Node::find_or_create(&jcr, "/content/site/es", Some("cq:Page")).await.unwrap();
    assert_eq!(created.primary_type().await.unwrap(), "cq:Page");
    assert!(!created.is_new().await.unwrap());

    let site = Node::find(&jcr, "/content/site").await.unwrap().unwrap();
    let child = site.find_or_create_child("pt", None).await.unwrap();
    assert_eq!(child.path(), "/content/site/pt");
    assert_eq!(child.primary_type().await.unwrap(), "nt:unstructured");
    assert_eq!(site.find_or_create_child("pt", None).await.unwrap(), child);
}

#[tokio::test]
async fn test_child_builders_inherit_blueprint() {
    let (_repo, jcr) = seeded().await;
    let site = Node::find(&jcr, "/content/site").await.unwrap().unwrap();

    let template = NodeBlueprint::pathless()
        .with_primary_type("cq:Page")
        .with_property("template", "/apps/site/templates/page");
    let de = site.create_child("de", Some(&template)).await.unwrap();
    assert_eq!(de.path(), "/content/site/de");
    assert_eq!(de.primary_type().await.unwrap(), "cq:Page");
    assert_eq!(de.get("template").await.unwrap(), Value::from("/apps/site/templates/page"));
    assert!(!de.is_new().await.unwrap());

    let staged = site.build_child("nl", None).await.unwrap();
    assert!(staged.is_new().await.unwrap());
    assert_eq!(staged.primary_type().await.unwrap(), "nt:unstructured");
}
