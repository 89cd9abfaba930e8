//! Behaviour every `MemoryStore` backend must share.
//!
//! Each check works under its own `root` segment and removes what it wrote, so
//! the same body runs against a fresh in-memory store or a shared database.

use super::MemoryStore;
use crate::models::{Item, Namespace, NamespaceQuery, SearchQuery};
use serde_json::{json, Value};
use std::time::Duration;

fn ns(root: &str, rest: &[&str]) -> Namespace {
    Namespace::new(std::iter::once(root).chain(rest.iter().copied())).unwrap()
}

fn keys(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.key.as_str()).collect()
}

async fn filtered(store: &dyn MemoryStore, prefix: &Namespace, filter: Value) -> Vec<Item> {
    let query = SearchQuery::new(prefix.clone()).with_filter(filter).unwrap();
    store.query(&query).await.unwrap()
}

async fn clear(store: &dyn MemoryStore, root: &str) {
    for item in store.search(&ns(root, &[])).await.unwrap() {
        store.delete(&item.namespace, &item.key).await.unwrap();
    }
}

pub(crate) async fn overwrite_keeps_created_at_and_position(store: &dyn MemoryStore, root: &str) {
    let user = ns(root, &["memories", "1"]);

    let first = store.put(&user, "a", json!({"fact": "likes pizza"})).await.unwrap();
    store.put(&user, "b", json!({"fact": "lives in Lyon"})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = store.put(&user, "a", json!({"fact": "likes pasta"})).await.unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);

    let items = store.search(&user).await.unwrap();
    assert_eq!(keys(&items), vec!["a", "b"]);
    assert_eq!(items[0].field("fact"), Some(&json!("likes pasta")));

    clear(store, root).await;
}

pub(crate) async fn filter_requires_equal_top_level_fields(store: &dyn MemoryStore, root: &str) {
    let user = ns(root, &["memories", "1"]);

    store.put(&user, "tags", json!({"tags": ["x", "y"]})).await.unwrap();
    store.put(&user, "float", json!({"n": 1.0})).await.unwrap();
    store
        .put(&user, "nested", json!({"meta": {"src": "chat", "lang": "en"}}))
        .await
        .unwrap();

    // Arrays and nested objects compare whole, not by containment
    assert!(filtered(store, &user, json!({"tags": ["x"]})).await.is_empty());
    assert_eq!(
        keys(&filtered(store, &user, json!({"tags": ["x", "y"]})).await),
        vec!["tags"]
    );
    assert!(filtered(store, &user, json!({"meta": {"src": "chat"}}))
        .await
        .is_empty());
    assert_eq!(
        keys(&filtered(store, &user, json!({"meta": {"lang": "en", "src": "chat"}})).await),
        vec!["nested"]
    );

    // Numbers compare by value
    assert_eq!(keys(&filtered(store, &user, json!({"n": 1})).await), vec!["float"]);
    assert!(filtered(store, &user, json!({"n": 2})).await.is_empty());

    // Missing field never matches, even against null
    assert!(filtered(store, &user, json!({"mood": null})).await.is_empty());

    clear(store, root).await;
}

pub(crate) async fn query_filters_then_paginates(store: &dyn MemoryStore, root: &str) {
    let user = ns(root, &["memories", "1"]);

    for i in 0..6 {
        let source = if i % 2 == 0 { "chat" } else { "profile" };
        store
            .put(&user, &format!("k{}", i), json!({"n": i, "source": source}))
            .await
            .unwrap();
    }

    let query = SearchQuery::new(user.clone())
        .with_filter(json!({"source": "chat"}))
        .unwrap();
    assert_eq!(keys(&store.query(&query).await.unwrap()), vec!["k0", "k2", "k4"]);

    let page = store
        .query(&query.clone().with_offset(1).with_limit(1))
        .await
        .unwrap();
    assert_eq!(keys(&page), vec!["k2"]);

    assert!(store.query(&query.with_offset(10)).await.unwrap().is_empty());

    clear(store, root).await;
}

pub(crate) async fn list_namespaces_by_prefix_and_depth(store: &dyn MemoryStore, root: &str) {
    store.put(&ns(root, &["memories", "2"]), "a", json!({})).await.unwrap();
    store.put(&ns(root, &["memories", "1"]), "a", json!({})).await.unwrap();
    store.put(&ns(root, &["memories", "1"]), "b", json!({})).await.unwrap();
    store.put(&ns(root, &["profiles", "1"]), "a", json!({})).await.unwrap();

    let under_root = NamespaceQuery::new().with_prefix(ns(root, &[]));

    let all = store.list_namespaces(&under_root).await.unwrap();
    assert_eq!(
        all,
        vec![
            ns(root, &["memories", "1"]),
            ns(root, &["memories", "2"]),
            ns(root, &["profiles", "1"]),
        ]
    );

    let second_level = store
        .list_namespaces(&under_root.clone().with_max_depth(2).unwrap())
        .await
        .unwrap();
    assert_eq!(
        second_level,
        vec![ns(root, &["memories"]), ns(root, &["profiles"])]
    );

    let first_page = store
        .list_namespaces(&under_root.clone().with_limit(1))
        .await
        .unwrap();
    assert_eq!(first_page, vec![ns(root, &["memories", "1"])]);

    store.delete(&ns(root, &["profiles", "1"]), "a").await.unwrap();
    assert_eq!(store.list_namespaces(&under_root).await.unwrap().len(), 2);

    clear(store, root).await;
}

pub(crate) async fn len_tracks_puts_and_deletes(store: &dyn MemoryStore, root: &str) {
    let user = ns(root, &["memories", "1"]);
    let before = store.len().await.unwrap();

    store.put(&user, "a", json!({"fact": "likes pizza"})).await.unwrap();
    store.put(&user, "b", json!({"fact": "likes sushi"})).await.unwrap();
    store.put(&user, "a", json!({"fact": "likes pasta"})).await.unwrap();
    assert_eq!(store.len().await.unwrap(), before + 2);

    store.delete(&user, "a").await.unwrap();
    store.delete(&user, "missing").await.unwrap();
    assert_eq!(store.len().await.unwrap(), before + 1);

    clear(store, root).await;
    assert_eq!(store.len().await.unwrap(), before);
}

/// Every shared check, one after another
pub(crate) async fn run_all(store: &dyn MemoryStore, root: &str) {
    overwrite_keeps_created_at_and_position(store, root).await;
    filter_requires_equal_top_level_fields(store, root).await;
    query_filters_then_paginates(store, root).await;
    list_namespaces_by_prefix_and_depth(store, root).await;
    len_tracks_puts_and_deletes(store, root).await;
}
