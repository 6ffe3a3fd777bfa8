//! Integration tests for lazy schema tree loading through `WorkbenchSession`

mod common;

use pretty_assertions::assert_eq;
use qdesk_session::{ErrorClass, FetchOutcome, NodeKind, NotificationLevel, SessionError};

use common::{Harness, MockEndpoint, creds, labels, names, wait_until};

async fn connected() -> Harness {
    let h = Harness::new(MockEndpoint::with_sample_schema());
    h.session.open("server1", &creds()).await.unwrap();
    h
}

fn child_ids(h: &Harness, node_id: &str) -> Vec<String> {
    let key = h.session.find(node_id).unwrap();
    h.session.children(key).into_iter().map(|n| n.id).collect()
}

// ============ Root ============

#[tokio::test]
async fn root_load_rebuilds_completion_index() {
    let h = connected().await;
    h.session.expand_id("shop").await.unwrap();
    assert_eq!(labels(&h.session), vec!["shop", "crm", "orders", "items"]);

    h.endpoint.respond("SHOW DATABASES", names("Database", &["analytics", "shop"]));
    h.session.load_root().await.unwrap();
    h.endpoint.respond("SHOW DATABASES", names("Database", &["warehouse"]));
    h.session.load_root().await.unwrap();

    assert_eq!(labels(&h.session), vec!["warehouse"]);
    assert!(h.session.find("shop").is_none());
}

#[tokio::test]
async fn tree_loading_flag_tracks_root_load() {
    let h = connected().await;
    let release = h.endpoint.gate("SHOW DATABASES");

    let task = {
        let session = h.session.clone();
        tokio::spawn(async move { session.load_root().await })
    };
    wait_until(|| h.session.tree_loading()).await;
    release.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert!(!h.session.tree_loading());
}

// ============ Expansion ============

#[tokio::test]
async fn expand_schema_and_table() {
    let h = connected().await;

    h.session.expand_id("shop").await.unwrap();
    h.session.expand_id("shop.orders").await.unwrap();

    assert_eq!(child_ids(&h, "shop"), vec!["shop.orders", "shop.items"]);
    let id = h.session.find("shop.orders.id").unwrap();
    let column = h.session.node(id).unwrap();
    assert_eq!(column.kind, NodeKind::Column);
    assert_eq!(column.data_type.as_deref(), Some("int(11)"));

    let queries = h.endpoint.queries();
    assert!(queries.contains(&"SHOW TABLES FROM `shop`;".to_string()));
    assert!(queries.iter().any(|q| q.contains("TABLE_SCHEMA = 'shop' AND TABLE_NAME = 'orders'")));
}

#[tokio::test]
async fn expansions_in_flight_together_stay_local() {
    let h = connected().await;
    let release_shop = h.endpoint.gate("SHOW TABLES FROM `shop`");
    let release_crm = h.endpoint.gate("SHOW TABLES FROM `crm`");
    let shop = h.session.find("shop").unwrap();
    let crm = h.session.find("crm").unwrap();

    let spawn_expand = |key| {
        let session = h.session.clone();
        tokio::spawn(async move { session.expand(key).await })
    };
    let shop_task = spawn_expand(shop);
    let crm_task = spawn_expand(crm);
    wait_until(|| h.session.is_expanding(shop) && h.session.is_expanding(crm)).await;

    release_crm.send(()).unwrap();
    crm_task.await.unwrap().unwrap();
    assert_eq!(child_ids(&h, "crm"), vec!["crm.contacts"]);
    assert!(h.session.children(shop).is_empty());

    release_shop.send(()).unwrap();
    shop_task.await.unwrap().unwrap();
    assert_eq!(child_ids(&h, "shop"), vec!["shop.orders", "shop.items"]);
    assert_eq!(child_ids(&h, "crm"), vec!["crm.contacts"]);
}

#[tokio::test]
async fn completions_append_in_expansion_order() {
    let h = connected().await;

    h.session.expand_id("crm").await.unwrap();
    h.session.expand_id("shop").await.unwrap();

    assert_eq!(
        labels(&h.session),
        vec!["shop", "crm", "contacts", "orders", "items"]
    );
    let details: Vec<_> = h
        .session
        .completion_entries()
        .into_iter()
        .map(|e| e.detail)
        .collect();
    assert_eq!(details, vec!["SCHEMA", "SCHEMA", "TABLE", "TABLE", "TABLE"]);
}

#[tokio::test]
async fn expansion_resolving_after_reload_changes_nothing() {
    let h = connected().await;
    let release = h.endpoint.gate("SHOW TABLES FROM `shop`");
    let stale = h.session.find("shop").unwrap();

    let task = {
        let session = h.session.clone();
        tokio::spawn(async move { session.expand(stale).await })
    };
    wait_until(|| h.session.is_expanding(stale)).await;

    h.session.load_root().await.unwrap();
    release.send(()).unwrap();

    assert_eq!(task.await.unwrap().unwrap(), FetchOutcome::Discarded);
    assert_eq!(labels(&h.session), vec!["shop", "crm"]);
    assert!(h.session.children(h.session.find("shop").unwrap()).is_empty());
    assert!(h.session.node(stale).is_none());
}

#[tokio::test]
async fn expanding_a_column_is_rejected() {
    let h = connected().await;
    h.session.expand_id("shop").await.unwrap();
    h.session.expand_id("shop.orders").await.unwrap();
    let before = h.endpoint.query_count();

    let err = h.session.expand_id("shop.orders.id").await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidNode(_)));
    assert_eq!(h.endpoint.query_count(), before);
    assert_eq!(h.notifier.count(NotificationLevel::Warning), 0);
}

#[tokio::test]
async fn unknown_node_id_is_rejected() {
    let h = connected().await;
    let err = h.session.expand_id("nowhere").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidNode(_)));
}

#[tokio::test]
async fn failed_expansion_is_local_and_retryable() {
    let h = connected().await;
    h.endpoint.fail_matching("SHOW TABLES FROM `shop`");

    let err = h.session.expand_id("shop").await.unwrap_err();

    assert!(matches!(err, SessionError::SchemaLoadFailed(_)));
    assert_eq!(err.class(), ErrorClass::OperationLocal);
    assert!(h.session.is_connected());
    assert!(h.endpoint.closed().is_empty());
    assert_eq!(h.notifier.count(NotificationLevel::Warning), 1);
    let shop = h.session.find("shop").unwrap();
    assert!(!h.session.node(shop).unwrap().children.is_fetched());
    assert_eq!(labels(&h.session), vec!["shop", "crm"]);

    h.endpoint.stop_failing();
    h.session.expand(shop).await.unwrap();
    assert_eq!(child_ids(&h, "shop"), vec!["shop.orders", "shop.items"]);
}

#[tokio::test]
async fn tree_view_marks_unexpanded_nodes() {
    let h = connected().await;
    h.session.expand_id("crm").await.unwrap();

    let view = h.session.tree_view();
    assert_eq!(view.len(), 2);
    assert!(view[0].children.is_none());
    let crm_children = view[1].children.as_ref().unwrap();
    assert_eq!(crm_children[0].id, "crm.contacts");
    assert_eq!(crm_children[0].kind, NodeKind::Table);
}
