//! Postgres-backed store
//!
//! Same contract as the in-memory store. Items survive restarts. The schema is
//! created lazily on first use.

use super::MemoryStore;
use crate::error::StoreError;
use crate::models::{
    into_item_value, validate_key, Item, Namespace, NamespaceQuery, SearchQuery,
};
use crate::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const ITEM_COLUMNS: &str = "namespace, key, value, created_at, updated_at";

pub struct PostgresStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresStore {
    /// Build a lazily connecting pool; no connection is made until first use
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)
            .map_err(db_error("Failed to create postgres pool"))?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        let pool = &self.pool;

        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS memory_items (
                      namespace TEXT[] NOT NULL,
                      key TEXT NOT NULL,
                      value JSONB NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                      seq BIGSERIAL,
                      PRIMARY KEY (namespace, key)
                    );
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_memory_items_seq
                    ON memory_items (seq);
                    "#,
                )
                .execute(pool)
                .await?;

                info!("Memory store schema ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(db_error("Failed to initialize memory store schema"))?;

        Ok(())
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::Database(format!("{}: {}", context, e))
}

fn item_from_row(row: &PgRow) -> Result<Item> {
    let segments: Vec<String> = row
        .try_get("namespace")
        .map_err(db_error("Failed to decode namespace"))?;
    let Json(value): Json<Value> = row
        .try_get("value")
        .map_err(db_error("Failed to decode value"))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(db_error("Failed to decode created_at"))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(db_error("Failed to decode updated_at"))?;

    Ok(Item {
        namespace: Namespace::new(segments)?,
        key: row.try_get("key").map_err(db_error("Failed to decode key"))?,
        value: into_item_value(value)?,
        created_at,
        updated_at,
    })
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl MemoryStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn put(&self, namespace: &Namespace, key: &str, value: Value) -> Result<Item> {
        validate_key(key)?;
        let value = into_item_value(value)?;
        self.ensure_schema().await?;

        let sql = format!(
            r#"
            INSERT INTO memory_items (namespace, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (namespace, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(namespace.segments().to_vec())
            .bind(key)
            .bind(Json(&value))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to upsert memory item"))?;

        debug!(namespace = %namespace, key, "Stored memory item");
        item_from_row(&row)
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<Item>> {
        validate_key(key)?;
        self.ensure_schema().await?;

        let sql = format!(
            "SELECT {} FROM memory_items WHERE namespace = $1 AND key = $2",
            ITEM_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(namespace.segments().to_vec())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load memory item"))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<Item>> {
        self.ensure_schema().await?;

        // Each filter field must equal the stored top-level field (jsonb `=`,
        // numeric for numbers). LIMIT NULL means no limit.
        let sql = format!(
            r#"
            SELECT {}
            FROM memory_items
            WHERE cardinality(namespace) >= $2
              AND namespace[1:$2] = $1
              AND ($3::jsonb IS NULL OR NOT EXISTS (
                SELECT 1 FROM jsonb_each($3::jsonb) AS f
                WHERE memory_items.value -> f.key IS DISTINCT FROM f.value
              ))
            ORDER BY seq ASC
            OFFSET $4
            LIMIT $5
            "#,
            ITEM_COLUMNS
        );

        let prefix_len = i32::try_from(query.prefix.len()).unwrap_or(i32::MAX);

        let rows = sqlx::query(&sql)
            .bind(query.prefix.segments().to_vec())
            .bind(prefix_len)
            .bind(query.filter.clone().map(Json))
            .bind(to_i64(query.offset))
            .bind(query.limit.map(to_i64))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to search memory items"))?;

        debug!(prefix = %query.prefix, hits = rows.len(), "Searched memory items");
        rows.iter().map(item_from_row).collect()
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool> {
        validate_key(key)?;
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM memory_items WHERE namespace = $1 AND key = $2")
            .bind(namespace.segments().to_vec())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete memory item"))?;

        let removed = result.rows_affected() > 0;
        debug!(namespace = %namespace, key, removed, "Deleted memory item");
        Ok(removed)
    }

    async fn list_namespaces(&self, query: &NamespaceQuery) -> Result<Vec<Namespace>> {
        self.ensure_schema().await?;

        let rows = sqlx::query("SELECT DISTINCT namespace FROM memory_items")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list namespaces"))?;

        let namespaces = rows
            .iter()
            .map(|row| {
                let segments: Vec<String> = row
                    .try_get("namespace")
                    .map_err(db_error("Failed to decode namespace"))?;
                Namespace::new(segments)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(query.collect(namespaces))
    }

    async fn len(&self) -> Result<usize> {
        self.ensure_schema().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memory_items")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count memory items"))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
