//! # SQLite Volume Index
//!
//! [`VolumeIndex`] implementation backed by a SQLite table.
//!
//! ## Overview
//!
//! The restore engine keeps its volume catalogue in the local database: one
//! row per remote volume with its object name, size and content hash. The
//! downloader resolves every cache miss through this index before asking the
//! backend to fetch.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pool = SqlitePool::connect("sqlite:catalog.db").await?;
//! let index = SqliteVolumeIndex::new(pool);
//! index.initialize().await?;
//!
//! let id = index.register(&VolumeInfo::new("vault-b0001.zvol", 1024, "ab12")).await?;
//! let info = index.volume_info(id).await?;
//! ```

use backend_traits::{BackendError, VolumeId, VolumeIndex, VolumeInfo};
use sqlx::{Row, SqlitePool};

/// SQLite implementation of the volume index
pub struct SqliteVolumeIndex {
    pool: SqlitePool,
}

impl SqliteVolumeIndex {
    /// Create a new index over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize database table if it doesn't exist
    pub async fn initialize(&self) -> backend_traits::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS volumes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                size INTEGER NOT NULL,
                hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BackendError::Index(e.to_string()))?;

        Ok(())
    }

    /// Registers a volume, returning its assigned id.
    pub async fn register(&self, info: &VolumeInfo) -> backend_traits::Result<VolumeId> {
        let result = sqlx::query(
            r#"
            INSERT INTO volumes (name, size, hash) VALUES (?, ?, ?)
            "#,
        )
        .bind(&info.name)
        .bind(info.size)
        .bind(&info.hash)
        .execute(&self.pool)
        .await
        .map_err(|e| BackendError::Index(e.to_string()))?;

        Ok(VolumeId::new(result.last_insert_rowid()))
    }

    /// Number of registered volumes.
    pub async fn count(&self) -> backend_traits::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM volumes")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BackendError::Index(e.to_string()))?;

        Ok(count as u64)
    }
}

#[async_trait::async_trait]
impl VolumeIndex for SqliteVolumeIndex {
    async fn volume_info(&self, volume: VolumeId) -> backend_traits::Result<Option<VolumeInfo>> {
        let row = sqlx::query(
            r#"
            SELECT name, size, hash FROM volumes WHERE id = ?
            "#,
        )
        .bind(volume.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BackendError::Index(e.to_string()))?;

        if let Some(row) = row {
            Ok(Some(VolumeInfo {
                name: row.get("name"),
                size: row.get("size"),
                hash: row.get("hash"),
            }))
        } else {
            Ok(None)
        }
    }
}
