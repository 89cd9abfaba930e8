//! Store persistence layer
//!
//! All callers go through the `MemoryStore` trait. The in-memory store is the
//! default; Postgres can be swapped in behind the same contract.

mod in_memory;
mod postgres;

#[cfg(test)]
mod contract;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use crate::models::{Item, Namespace, NamespaceQuery, SearchQuery};
use crate::Result;
use serde_json::Value;

/// Trait for namespaced key/value persistence
#[async_trait::async_trait]
pub trait MemoryStore: Send + Sync {
    /// Short backend label used in logs
    fn backend_name(&self) -> &'static str;

    /// Insert or overwrite the item at `(namespace, key)`.
    ///
    /// `value` must be a JSON object. Overwriting keeps the original
    /// `created_at` and insertion position.
    async fn put(&self, namespace: &Namespace, key: &str, value: Value) -> Result<Item>;

    /// Exact lookup; `None` when absent
    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<Item>>;

    /// Prefix search with optional filter and pagination, in insertion order
    async fn query(&self, query: &SearchQuery) -> Result<Vec<Item>>;

    /// Returns true if an item was removed
    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool>;

    /// Distinct namespaces currently holding at least one item
    async fn list_namespaces(&self, query: &NamespaceQuery) -> Result<Vec<Namespace>>;

    /// Number of items held
    async fn len(&self) -> Result<usize>;

    /// Every item whose namespace equals or starts with `prefix`
    async fn search(&self, prefix: &Namespace) -> Result<Vec<Item>> {
        self.query(&SearchQuery::new(prefix.clone())).await
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
