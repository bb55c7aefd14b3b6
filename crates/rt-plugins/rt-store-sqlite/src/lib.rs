//! # rt-store-sqlite Implementation
//!
//! This module implements the `RemoteStore` document model on SQLite: one
//! `documents` table keyed by (collection, id) with JSON bodies, plus a
//! per-collection watch channel that re-delivers the whole collection
//! after every write.

use async_trait::async_trait;
use dashmap::DashMap;
use rt_core::edit::ArrayEdit;
use rt_core::error::{AppError, Result};
use rt_core::models::Collection;
use rt_core::subscription::{CollectionSnapshot, Delivery, Subscription};
use rt_core::traits::RemoteStore;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
)";

const UPSERT: &str = "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
     ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at";

pub struct SqliteStore {
    pool: SqlitePool,
    watchers: DashMap<Collection, watch::Sender<Delivery>>,
    /// Serializes writes with their snapshot publication so observers
    /// never receive an older snapshot after a newer one.
    write_lock: Mutex<()>,
}

fn setup_error(e: sqlx::Error) -> AppError {
    AppError::Internal(format!("sqlite setup failed: {e}"))
}

fn write_error(e: sqlx::Error) -> AppError {
    AppError::StoreWriteFailed(e.to_string())
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(setup_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(setup_error)?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database. Pinned to a single connection that is
    /// never recycled, since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(setup_error)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(setup_error)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await.map_err(setup_error)?;
        tracing::debug!("document schema ready");
        Ok(Self {
            pool,
            watchers: DashMap::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Number of open subscriptions on `collection`.
    pub fn active_watches(&self, collection: Collection) -> usize {
        self.watchers
            .get(&collection)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    async fn load_collection(&self, collection: Collection) -> Result<CollectionSnapshot> {
        let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::StoreReadCancelled(e.to_string()))?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let body: String = row.get("body");
            match serde_json::from_str::<Value>(&body) {
                Ok(doc) => docs.push((id, doc)),
                Err(e) => tracing::warn!(%collection, doc_id = %id, error = %e, "corrupt document body"),
            }
        }
        Ok(docs.into_iter().collect())
    }

    /// Re-delivers `collection` to its watchers, if it has ever been watched.
    async fn publish(&self, collection: Collection) {
        if !self.watchers.contains_key(&collection) {
            return;
        }
        let delivery = self.load_collection(collection).await.map(Arc::new);
        if let Some(tx) = self.watchers.get(&collection) {
            tx.send_replace(delivery);
        }
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::StoreReadCancelled(e.to_string()))?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                serde_json::from_str(&body)
                    .map(Some)
                    .map_err(|e| AppError::StoreReadCancelled(format!("corrupt {collection}/{id}: {e}")))
            }
            None => Ok(None),
        }
    }

    /// Upserts the document, then fans the new collection state out to watchers.
    async fn set(&self, collection: Collection, id: &str, doc: Value) -> Result<()> {
        let body = serde_json::to_string(&doc).map_err(|e| AppError::StoreWriteFailed(e.to_string()))?;
        let _guard = self.write_lock.lock().await;

        sqlx::query(UPSERT)
            .bind(collection.as_str())
            .bind(id)
            .bind(body)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        tracing::debug!(%collection, doc_id = %id, "document written");
        self.publish(collection).await;
        Ok(())
    }

    /// Read, edit and write happen in one transaction under the write lock,
    /// so no other write to the store can land in between.
    async fn edit_array(&self, collection: Collection, id: &str, field: &str, edit: ArrayEdit) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(write_error)?;

        let body: Option<String> = sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(write_error)?;
        let current = body
            .map(|body| serde_json::from_str::<Value>(&body))
            .transpose()
            .map_err(|e| AppError::StoreWriteFailed(format!("corrupt {collection}/{id}: {e}")))?;

        let (doc, changed) = edit.apply(current, field)?;
        if !changed {
            return Ok(false);
        }
        let body = serde_json::to_string(&doc).map_err(|e| AppError::StoreWriteFailed(e.to_string()))?;
        sqlx::query(UPSERT)
            .bind(collection.as_str())
            .bind(id)
            .bind(body)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        tx.commit().await.map_err(write_error)?;

        tracing::debug!(%collection, doc_id = %id, field, "array field edited");
        self.publish(collection).await;
        Ok(true)
    }

    async fn watch(&self, collection: Collection) -> Result<Subscription> {
        if let Some(tx) = self.watchers.get(&collection) {
            return Ok(Subscription::new(tx.subscribe()));
        }

        // Holding the write lock keeps a write from landing between the
        // initial load and the channel becoming visible to `publish`.
        let _guard = self.write_lock.lock().await;
        if let Some(tx) = self.watchers.get(&collection) {
            return Ok(Subscription::new(tx.subscribe()));
        }
        let snapshot = self.load_collection(collection).await?;
        let (tx, rx) = watch::channel::<Delivery>(Ok(Arc::new(snapshot)));
        self.watchers.insert(collection, tx);
        tracing::debug!(%collection, "collection watch opened");
        Ok(Subscription::new(rx))
    }
}
