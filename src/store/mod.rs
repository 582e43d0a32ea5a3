//! Prediction persistence.
//!
//! The store is the lock: a prediction is "locked" the moment
//! `insert_if_absent` commits it, and the normal lifecycle has no update
//! or delete. Two implementations: an in-process map for tests and
//! single-instance runs, and SQLite where the check-and-set must hold
//! across server instances.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::types::{EngineError, Prediction, Result};

/// Keyed, write-once prediction storage.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn exists(&self, match_id: &str) -> Result<bool>;

    async fn get(&self, match_id: &str) -> Result<Option<Prediction>>;

    /// Persist the prediction unless one is already locked for this
    /// match id. Returns true when this call won the lock; on false the
    /// caller must discard its value and re-read the winner's.
    async fn insert_if_absent(&self, prediction: &Prediction) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store backed by a concurrent map. The entry API makes
/// `insert_if_absent` atomic per key.
#[derive(Default)]
pub struct MemoryStore {
    inner: DashMap<String, Prediction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl PredictionStore for MemoryStore {
    async fn exists(&self, match_id: &str) -> Result<bool> {
        Ok(self.inner.contains_key(match_id))
    }

    async fn get(&self, match_id: &str) -> Result<Option<Prediction>> {
        Ok(self.inner.get(match_id).map(|entry| entry.value().clone()))
    }

    async fn insert_if_absent(&self, prediction: &Prediction) -> Result<bool> {
        use dashmap::mapref::entry::Entry;
        match self.inner.entry(prediction.match_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(prediction.clone());
                Ok(true)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SQLite store
// ---------------------------------------------------------------------------

/// Durable store. Predictions are serialized JSON rows keyed by match
/// id; `INSERT … ON CONFLICT DO NOTHING` makes the lock atomic at the
/// database, so it holds across processes.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        // An in-memory sqlite database is per-connection; a pool of one
        // keeps every query on the same database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| EngineError::Store(format!("connect {url}: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                match_id   TEXT PRIMARY KEY,
                payload    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| EngineError::Store(format!("migrate: {e}")))?;

        info!(url, "Prediction store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl PredictionStore for SqliteStore {
    async fn exists(&self, match_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM predictions WHERE match_id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn get(&self, match_id: &str) -> Result<Option<Prediction>> {
        let row = sqlx::query("SELECT payload FROM predictions WHERE match_id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let payload: String = row
                    .try_get("payload")
                    .map_err(|e| EngineError::Store(e.to_string()))?;
                let prediction = serde_json::from_str(&payload)
                    .map_err(|e| EngineError::Store(format!("corrupt payload: {e}")))?;
                Ok(Some(prediction))
            }
        }
    }

    async fn insert_if_absent(&self, prediction: &Prediction) -> Result<bool> {
        let payload = serde_json::to_string(prediction)
            .map_err(|e| EngineError::Store(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO predictions (match_id, payload, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(match_id) DO NOTHING
            "#,
        )
        .bind(&prediction.match_id)
        .bind(&payload)
        .bind(prediction.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Store(e.to_string()))?;

        let won = result.rows_affected() == 1;
        debug!(match_id = %prediction.match_id, won, "insert_if_absent");
        Ok(won)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
