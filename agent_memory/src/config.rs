//! Backend selection from the environment

use crate::error::StoreError;
use crate::store::{InMemoryStore, MemoryStore, PostgresStore};
use crate::Result;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    InMemory,
    Postgres,
}

impl BackendKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(BackendKind::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            other => Err(StoreError::Config(format!(
                "unknown MEMORY_STORE_BACKEND '{}' (expected 'memory' or 'postgres')",
                other
            ))),
        }
    }
}

/// Configuration for building a memory store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::InMemory,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl StoreConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("POSTGRES_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty());

        let backend = match lookup("MEMORY_STORE_BACKEND") {
            Some(raw) if !raw.trim().is_empty() => BackendKind::parse(&raw)?,
            _ if database_url.is_some() => BackendKind::Postgres,
            _ => BackendKind::InMemory,
        };

        let max_connections = match lookup("MEMORY_STORE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(StoreError::Config(format!(
                        "MEMORY_STORE_MAX_CONNECTIONS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        if backend == BackendKind::Postgres && database_url.is_none() {
            return Err(StoreError::Config(
                "postgres backend requires POSTGRES_URL or DATABASE_URL".to_string(),
            ));
        }

        Ok(Self {
            backend,
            database_url,
            max_connections,
        })
    }
}

/// Build the configured store, falling back to in-memory if the pool
/// cannot be created
pub fn build_store(config: &StoreConfig) -> Arc<dyn MemoryStore> {
    if config.backend == BackendKind::Postgres {
        if let Some(url) = config.database_url.as_deref() {
            match PostgresStore::connect_lazy(url, config.max_connections) {
                Ok(store) => {
                    info!("Memory store backend: postgres");
                    return Arc::new(store);
                }
                Err(error) => {
                    warn!(
                        "Failed to initialize postgres memory store, falling back to in-memory: {}",
                        error
                    );
                }
            }
        }
    }

    info!("Memory store backend: in-memory");
    Arc::new(InMemoryStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<StoreConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_to_in_memory() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/memories")]).unwrap();
        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/memories"));
    }

    #[test]
    fn test_explicit_memory_backend_wins() {
        let config = config_from(&[
            ("MEMORY_STORE_BACKEND", "memory"),
            ("POSTGRES_URL", "postgres://localhost/memories"),
        ])
        .unwrap();
        assert_eq!(config.backend, BackendKind::InMemory);
    }

    #[test]
    fn test_postgres_without_url_is_error() {
        let err = config_from(&[("MEMORY_STORE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(config_from(&[("MEMORY_STORE_BACKEND", "redis")]).is_err());
        assert!(config_from(&[("MEMORY_STORE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(config_from(&[("MEMORY_STORE_MAX_CONNECTIONS", "lots")]).is_err());

        let config = config_from(&[("MEMORY_STORE_MAX_CONNECTIONS", "12")]).unwrap();
        assert_eq!(config.max_connections, 12);
    }

    #[tokio::test]
    async fn test_build_store_falls_back() {
        let config = StoreConfig {
            backend: BackendKind::Postgres,
            database_url: Some("not a url".to_string()),
            max_connections: 1,
        };
        let store = build_store(&config);
        assert_eq!(store.backend_name(), "in-memory");

        let store = build_store(&StoreConfig::default());
        assert_eq!(store.backend_name(), "in-memory");
    }
}
