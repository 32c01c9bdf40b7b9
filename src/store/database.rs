//! Database-backed content store.
//!
//! Stores object content as base64 text in the `blobs` table. This is the
//! fallback for environments without object storage; it keeps everything in
//! one database at the cost of inflating large payloads, and is not
//! recommended for big files.

use chrono::{DateTime, Utc};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{ContentStore, CopyStatus, ObjectRef, ObjectSummary, StoredObject};
use crate::db::escape_like;
use crate::{DepotError, Result};

/// Content store keeping objects in the metadata database itself.
#[derive(Debug, Clone)]
pub struct DatabaseContentStore {
    pool: SqlitePool,
}

impl DatabaseContentStore {
    /// Create a new store over the given pool.
    ///
    /// The pool must have the Depot schema applied (the `blobs` table).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for DatabaseContentStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectRef> {
        sqlx::query(
            "INSERT INTO blobs (path, content, content_type, size, last_modified)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                content = excluded.content,
                content_type = excluded.content_type,
                size = excluded.size,
                last_modified = excluded.last_modified",
        )
        .bind(path)
        .bind(BASE64.encode(data))
        .bind(content_type)
        .bind(data.len() as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(ObjectRef {
            path: path.to_string(),
            etag: Uuid::new_v4().to_string(),
            size: data.len() as u64,
        })
    }

    async fn get(&self, path: &str) -> Result<Option<StoredObject>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT content, content_type FROM blobs WHERE path = ?")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((encoded, content_type)) => {
                let content = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    DepotError::StoreUnavailable(format!("corrupt stored content at {path}: {e}"))
                })?;
                Ok(Some(StoredObject {
                    content,
                    content_type,
                }))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blobs WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn begin_copy(&self, src: &str, dst: &str) -> Result<CopyStatus> {
        let result = sqlx::query(
            "INSERT INTO blobs (path, content, content_type, size, last_modified)
             SELECT ?, content, content_type, size, ? FROM blobs WHERE path = ?
             ON CONFLICT(path) DO UPDATE SET
                content = excluded.content,
                content_type = excluded.content_type,
                size = excluded.size,
                last_modified = excluded.last_modified",
        )
        .bind(dst)
        .bind(Utc::now())
        .bind(src)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(CopyStatus::Completed)
        } else {
            Ok(CopyStatus::Failed(format!("source object {src} not found")))
        }
    }

    async fn copy_status(&self, dst: &str) -> Result<CopyStatus> {
        if self.exists(dst).await? {
            Ok(CopyStatus::Completed)
        } else {
            Ok(CopyStatus::Failed(format!("no copy destination at {dst}")))
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blobs WHERE path = ?)")
            .bind(path)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let rows: Vec<(String, i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT path, size, last_modified FROM blobs
             WHERE path LIKE ? ESCAPE '\\' ORDER BY path",
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(path, size, last_modified)| ObjectSummary {
                path,
                size: size as u64,
                last_modified,
            })
            .collect())
    }
}
