use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::get_data_directory;
use crate::errors::{AppError, AppResult};
use crate::queue::item::{UploadItem, UploadStatus};

/// How many finished attempts the history retains; oldest are trimmed first.
pub const HISTORY_CAPACITY: usize = 50;

/// Metadata of one finished upload attempt. The file payload is never
/// persisted, only its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub status: UploadStatus,
    pub progress_percent: u8,
    pub upload_speed_bytes_per_sec: u64,
    pub error: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl From<&UploadItem> for HistoryRecord {
    fn from(item: &UploadItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            size_bytes: item.size_bytes,
            mime_type: item.mime_type.clone(),
            status: item.status,
            progress_percent: item.progress_percent,
            upload_speed_bytes_per_sec: item.upload_speed_bytes_per_sec,
            error: item.error.clone(),
            uploaded_at: item.uploaded_at,
        }
    }
}

/// Durable record of past upload attempts, independent of the live queue.
/// `list` reflects every `save` and `clear` that settled before it.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<HistoryRecord>>;
    async fn save(&self, record: &HistoryRecord) -> AppResult<()>;
    async fn clear(&self, ids: &[Uuid]) -> AppResult<()>;
}

/// In-memory store for tests and ephemeral sessions. Newest first, capped at
/// [`HISTORY_CAPACITY`].
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn list(&self) -> AppResult<Vec<HistoryRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| AppError::persistence(format!("history lock poisoned: {}", e)))?;
        Ok(records.clone())
    }

    async fn save(&self, record: &HistoryRecord) -> AppResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| AppError::persistence(format!("history lock poisoned: {}", e)))?;
        records.retain(|r| r.id != record.id);
        records.insert(0, record.clone());
        records.truncate(HISTORY_CAPACITY);
        Ok(())
    }

    async fn clear(&self, ids: &[Uuid]) -> AppResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| AppError::persistence(format!("history lock poisoned: {}", e)))?;
        records.retain(|r| !ids.contains(&r.id));
        Ok(())
    }
}

/// SQLite-backed history store.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Connect to the given database URL and create the schema if needed.
    ///
    /// The pool is pinned to a single connection: the queue writes
    /// sequentially anyway, and `sqlite::memory:` databases are per
    /// connection.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_history (
                id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                status TEXT NOT NULL,
                progress_percent INTEGER NOT NULL DEFAULT 0,
                upload_speed INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                uploaded_at DATETIME,
                recorded_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_upload_history_status ON upload_history(status)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_upload_history_recorded ON upload_history(recorded_at)",
        )
        .execute(&pool)
        .await?;

        log::info!("Upload history store initialized");
        Ok(Self { pool })
    }

    /// Open the store at its default location under the user data directory.
    pub async fn open_default() -> AppResult<Self> {
        let data_dir = get_data_directory()?;
        let db_path = data_dir.join("upload_history.db");

        if !db_path.exists() {
            std::fs::File::create(&db_path).map_err(|e| {
                AppError::config(format!(
                    "Cannot create history database file {}: {}",
                    db_path.display(),
                    e
                ))
            })?;
        }

        let database_url = format!("sqlite:{}", db_path.display());
        log::info!("History database path: {}", db_path.display());
        Self::connect(&database_url).await
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn list(&self) -> AppResult<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_name, size_bytes, mime_type, status,
                   progress_percent, upload_speed, error_message, uploaded_at
            FROM upload_history
            ORDER BY recorded_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let status: String = row.try_get("status")?;

            records.push(HistoryRecord {
                id: Uuid::parse_str(&id)
                    .map_err(|e| AppError::persistence(format!("corrupt record id: {}", e)))?,
                name: row.try_get("file_name")?,
                size_bytes: row.try_get::<i64, _>("size_bytes")? as u64,
                mime_type: row.try_get("mime_type")?,
                status: status
                    .parse::<UploadStatus>()
                    .map_err(AppError::Persistence)?,
                progress_percent: row.try_get::<i64, _>("progress_percent")? as u8,
                upload_speed_bytes_per_sec: row.try_get::<i64, _>("upload_speed")? as u64,
                error: row.try_get("error_message")?,
                uploaded_at: row.try_get("uploaded_at")?,
            });
        }

        Ok(records)
    }

    async fn save(&self, record: &HistoryRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO upload_history
                (id, file_name, size_bytes, mime_type, status,
                 progress_percent, upload_speed, error_message, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(record.size_bytes as i64)
        .bind(&record.mime_type)
        .bind(record.status.to_string())
        .bind(record.progress_percent as i64)
        .bind(record.upload_speed_bytes_per_sec as i64)
        .bind(&record.error)
        .bind(record.uploaded_at)
        .execute(&self.pool)
        .await?;

        // Trim to capacity, oldest first
        sqlx::query(
            r#"
            DELETE FROM upload_history
            WHERE id NOT IN (
                SELECT id FROM upload_history
                ORDER BY recorded_at DESC, rowid DESC
                LIMIT ?
            )
            "#,
        )
        .bind(HISTORY_CAPACITY as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, ids: &[Uuid]) -> AppResult<()> {
        for id in ids {
            sqlx::query("DELETE FROM upload_history WHERE id = ?")
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}
