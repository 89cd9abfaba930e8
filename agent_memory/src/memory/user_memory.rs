//! User fact memory
//!
//! Stores facts about one user under `["memories", <user_id>]` and formats
//! them as prompt context.

use crate::models::{Item, Namespace};
use crate::store::MemoryStore;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Root segment shared by all user namespaces
pub const MEMORIES_ROOT: &str = "memories";

/// Field holding the fact text inside an item value
const FACT_FIELD: &str = "fact";

/// Handle scoping a shared store to a single user
#[derive(Clone)]
pub struct UserMemory {
    store: Arc<dyn MemoryStore>,
    namespace: Namespace,
}

impl UserMemory {
    /// Fails when `user_id` is empty
    pub fn new(store: Arc<dyn MemoryStore>, user_id: &str) -> Result<Self> {
        let namespace = Namespace::new([MEMORIES_ROOT, user_id])?;
        Ok(Self { store, namespace })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Store a fact under a fresh key
    pub async fn remember(&self, fact: &str) -> Result<Item> {
        let key = Uuid::new_v4().to_string();
        let item = self
            .store
            .put(&self.namespace, &key, json!({ FACT_FIELD: fact }))
            .await?;

        info!(namespace = %self.namespace, key = %key, "Remembered user fact");
        Ok(item)
    }

    /// Store an arbitrary value under a caller-chosen key (overwrites)
    pub async fn remember_with_key(&self, key: &str, value: Value) -> Result<Item> {
        self.store.put(&self.namespace, key, value).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<Item>> {
        self.store.get(&self.namespace, key).await
    }

    /// All memories of this user, oldest first
    pub async fn recall(&self) -> Result<Vec<Item>> {
        self.store.search(&self.namespace).await
    }

    /// Fact strings only; items without a textual `fact` are skipped
    pub async fn facts(&self) -> Result<Vec<String>> {
        Ok(self
            .recall()
            .await?
            .iter()
            .filter_map(|item| item.field(FACT_FIELD).and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    pub async fn forget(&self, key: &str) -> Result<bool> {
        self.store.delete(&self.namespace, key).await
    }

    /// Memories rendered for an LLM system prompt; empty when nothing is known
    pub async fn format_for_prompt(&self) -> Result<String> {
        let facts = self.facts().await?;
        if facts.is_empty() {
            return Ok(String::new());
        }

        let mut context = String::from("## Memories about the user\n\n");
        for fact in &facts {
            context.push_str(&format!("- {}\n", fact));
        }
        Ok(context)
    }
}
