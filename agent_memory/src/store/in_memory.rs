//! In-memory store
//!
//! Items live for the lifetime of the process. Clones share one index, so a
//! single store can be handed to many sessions or tasks.

use super::MemoryStore;
use crate::models::{
    into_item_value, paginate, validate_key, Item, Namespace, NamespaceQuery, SearchQuery,
};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type ItemId = (Namespace, String);

struct Slot {
    /// Insertion order; survives overwrites
    seq: u64,
    item: Item,
}

#[derive(Default)]
struct Index {
    slots: HashMap<ItemId, Slot>,
    next_seq: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    index: Arc<RwLock<Index>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MemoryStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn put(&self, namespace: &Namespace, key: &str, value: Value) -> Result<Item> {
        validate_key(key)?;
        let value = into_item_value(value)?;

        let mut index = self.index.write().await;
        let id = (namespace.clone(), key.to_string());

        if let Some(slot) = index.slots.get_mut(&id) {
            slot.item.replace_value(value);
            debug!(namespace = %namespace, key, "Updated memory item");
            return Ok(slot.item.clone());
        }

        let seq = index.next_seq;
        index.next_seq += 1;

        let item = Item::new(namespace.clone(), key.to_string(), value);
        index.slots.insert(id, Slot { seq, item: item.clone() });
        debug!(namespace = %namespace, key, seq, "Inserted memory item");

        Ok(item)
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<Item>> {
        validate_key(key)?;

        let index = self.index.read().await;
        let id = (namespace.clone(), key.to_string());
        Ok(index.slots.get(&id).map(|slot| slot.item.clone()))
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<Item>> {
        let index = self.index.read().await;

        let mut hits: Vec<&Slot> = index
            .slots
            .values()
            .filter(|slot| query.matches(&slot.item))
            .collect();
        hits.sort_by_key(|slot| slot.seq);

        let items: Vec<Item> = hits.into_iter().map(|slot| slot.item.clone()).collect();
        let items = paginate(items, query.offset, query.limit);

        debug!(prefix = %query.prefix, hits = items.len(), "Searched memory items");
        Ok(items)
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool> {
        validate_key(key)?;

        let mut index = self.index.write().await;
        let removed = index
            .slots
            .remove(&(namespace.clone(), key.to_string()))
            .is_some();

        debug!(namespace = %namespace, key, removed, "Deleted memory item");
        Ok(removed)
    }

    async fn list_namespaces(&self, query: &NamespaceQuery) -> Result<Vec<Namespace>> {
        let index = self.index.read().await;
        Ok(query.collect(index.slots.keys().map(|(ns, _)| ns.clone())))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.index.read().await.slots.len())
    }
}
