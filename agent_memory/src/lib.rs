//! Agent Memory Store
//!
//! Namespaced key/value memory for conversational agents:
//! - Items are addressed by a hierarchical namespace plus a key
//! - Prefix search scopes reads to one user, one team, or everything
//! - In-memory by default, Postgres when configured
//!
//! The store is constructed explicitly and shared as `Arc<dyn MemoryStore>`;
//! there is no global instance.

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod store;

pub use error::Result;

// Re-export common types
pub use config::{build_store, BackendKind, StoreConfig};
pub use error::StoreError;
pub use memory::UserMemory;
pub use models::{Item, ItemValue, Namespace, NamespaceQuery, SearchQuery};
pub use store::{InMemoryStore, MemoryStore, PostgresStore};
