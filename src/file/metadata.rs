//! Metadata repositories for files and directories.
//!
//! The metadata index is the source of truth for hierarchy and listing.
//! Paths are unique across the two tables combined; multi-row mutations for
//! one logical operation (subtree rename, subtree delete) run in a single
//! transaction.

use chrono::Utc;
use sqlx::SqlitePool;

use super::entry::{DirectoryEntry, FileEntry, NewDirectory, NewFile};
use crate::db::escape_like;
use crate::{DepotError, Result};

/// Check whether a path is taken by either a file or a directory record.
pub async fn path_taken<'e, E>(executor: E, path: &str) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM files WHERE path = ?)
             OR EXISTS(SELECT 1 FROM directories WHERE path = ?)",
    )
    .bind(path)
    .bind(path)
    .fetch_one(executor)
    .await?;
    Ok(taken)
}

/// LIKE pattern matching everything strictly below `path`.
fn subtree_pattern(path: &str) -> String {
    format!("{}/%", escape_like(path))
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    ///
    /// Fails with `AlreadyExists` if the path is taken by any file or
    /// directory record.
    pub async fn insert(&self, new_file: &NewFile) -> Result<FileEntry> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if path_taken(&mut *tx, &new_file.path).await? {
            return Err(DepotError::AlreadyExists(new_file.path.clone()));
        }

        let result = sqlx::query(
            "INSERT INTO files (name, path, size, content_type, parent_id, created_at, last_modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_file.name)
        .bind(&new_file.path)
        .bind(new_file.size)
        .bind(&new_file.content_type)
        .bind(new_file.parent_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DepotError::Database("inserted file row missing".to_string()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileEntry>> {
        let file = sqlx::query_as::<_, FileEntry>(
            "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(file)
    }

    /// Get a file by path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<FileEntry>> {
        let file = sqlx::query_as::<_, FileEntry>(
            "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
             FROM files WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await?;
        Ok(file)
    }

    /// List the files directly inside a directory path ("" for root level).
    ///
    /// Matching is by path, so files whose parent directory was never
    /// indexed still list correctly.
    pub async fn list_direct_under(&self, dir_path: &str) -> Result<Vec<FileEntry>> {
        let files = if dir_path.is_empty() {
            sqlx::query_as::<_, FileEntry>(
                "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
                 FROM files WHERE path NOT LIKE '%/%' ORDER BY name",
            )
            .fetch_all(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, FileEntry>(
                "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
                 FROM files
                 WHERE path LIKE ? ESCAPE '\\' AND path NOT LIKE ? ESCAPE '\\'
                 ORDER BY name",
            )
            .bind(subtree_pattern(dir_path))
            .bind(format!("{}/%/%", escape_like(dir_path)))
            .fetch_all(self.pool)
            .await?
        };
        Ok(files)
    }

    /// List files by parent directory ID (None for unlinked and root-level
    /// files).
    pub async fn list_by_parent(&self, parent_id: Option<i64>) -> Result<Vec<FileEntry>> {
        let files = sqlx::query_as::<_, FileEntry>(
            "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
             FROM files WHERE parent_id IS ? ORDER BY name",
        )
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;
        Ok(files)
    }

    /// List every file at or below a directory path.
    pub async fn list_subtree(&self, dir_path: &str) -> Result<Vec<FileEntry>> {
        let files = if dir_path.is_empty() {
            sqlx::query_as::<_, FileEntry>(
                "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
                 FROM files ORDER BY path",
            )
            .fetch_all(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, FileEntry>(
                "SELECT id, name, path, size, content_type, parent_id, created_at, last_modified_at
                 FROM files WHERE path LIKE ? ESCAPE '\\' ORDER BY path",
            )
            .bind(subtree_pattern(dir_path))
            .fetch_all(self.pool)
            .await?
        };
        Ok(files)
    }

    /// Sum of file sizes at or below a directory path ("" for all files).
    pub async fn sum_sizes_under(&self, dir_path: &str) -> Result<i64> {
        let total: i64 = if dir_path.is_empty() {
            sqlx::query_scalar("SELECT COALESCE(SUM(size), 0) FROM files")
                .fetch_one(self.pool)
                .await?
        } else {
            sqlx::query_scalar(
                "SELECT COALESCE(SUM(size), 0) FROM files WHERE path LIKE ? ESCAPE '\\'",
            )
            .bind(subtree_pattern(dir_path))
            .fetch_one(self.pool)
            .await?
        };
        Ok(total)
    }

    /// Rewrite a file's location after a rename or move.
    ///
    /// Returns `false` if the file no longer exists.
    pub async fn update_location(
        &self,
        id: i64,
        new_path: &str,
        new_name: &str,
        new_parent_id: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET path = ?, name = ?, parent_id = ?, last_modified_at = ? WHERE id = ?",
        )
        .bind(new_path)
        .bind(new_name)
        .bind(new_parent_id)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a file record by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Repository for directory metadata operations.
pub struct DirectoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DirectoryRepository<'a> {
    /// Create a new DirectoryRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new directory record.
    ///
    /// Fails with `AlreadyExists` if the path is taken by any file or
    /// directory record.
    pub async fn insert(&self, new_dir: &NewDirectory) -> Result<DirectoryEntry> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if path_taken(&mut *tx, &new_dir.path).await? {
            return Err(DepotError::AlreadyExists(new_dir.path.clone()));
        }

        let result = sqlx::query(
            "INSERT INTO directories (name, path, parent_id, created_at, last_modified_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new_dir.name)
        .bind(&new_dir.path)
        .bind(new_dir.parent_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DepotError::Database("inserted directory row missing".to_string()))
    }

    /// Get a directory by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<DirectoryEntry>> {
        let dir = sqlx::query_as::<_, DirectoryEntry>(
            "SELECT id, name, path, parent_id, created_at, last_modified_at
             FROM directories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(dir)
    }

    /// Get a directory by path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<DirectoryEntry>> {
        let dir = sqlx::query_as::<_, DirectoryEntry>(
            "SELECT id, name, path, parent_id, created_at, last_modified_at
             FROM directories WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await?;
        Ok(dir)
    }

    /// List the directories directly inside a directory path ("" for root
    /// level).
    pub async fn list_direct_under(&self, dir_path: &str) -> Result<Vec<DirectoryEntry>> {
        let dirs = if dir_path.is_empty() {
            sqlx::query_as::<_, DirectoryEntry>(
                "SELECT id, name, path, parent_id, created_at, last_modified_at
                 FROM directories WHERE path NOT LIKE '%/%' ORDER BY name",
            )
            .fetch_all(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, DirectoryEntry>(
                "SELECT id, name, path, parent_id, created_at, last_modified_at
                 FROM directories
                 WHERE path LIKE ? ESCAPE '\\' AND path NOT LIKE ? ESCAPE '\\'
                 ORDER BY name",
            )
            .bind(subtree_pattern(dir_path))
            .bind(format!("{}/%/%", escape_like(dir_path)))
            .fetch_all(self.pool)
            .await?
        };
        Ok(dirs)
    }

    /// List directories by parent directory ID (None for unlinked and
    /// root-level directories).
    pub async fn list_by_parent(&self, parent_id: Option<i64>) -> Result<Vec<DirectoryEntry>> {
        let dirs = sqlx::query_as::<_, DirectoryEntry>(
            "SELECT id, name, path, parent_id, created_at, last_modified_at
             FROM directories WHERE parent_id IS ? ORDER BY name",
        )
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;
        Ok(dirs)
    }

    /// List every directory strictly below a directory path.
    pub async fn list_subtree(&self, dir_path: &str) -> Result<Vec<DirectoryEntry>> {
        let dirs = sqlx::query_as::<_, DirectoryEntry>(
            "SELECT id, name, path, parent_id, created_at, last_modified_at
             FROM directories WHERE path LIKE ? ESCAPE '\\' ORDER BY path",
        )
        .bind(subtree_pattern(dir_path))
        .fetch_all(self.pool)
        .await?;
        Ok(dirs)
    }

    /// Rewrite a directory subtree after a rename or move.
    ///
    /// Rewrites the path of the directory itself and of every descendant
    /// file and directory by prefix substitution, and updates the root
    /// row's name and parent, all in one transaction.
    pub async fn rename_subtree(
        &self,
        dir_id: i64,
        old_path: &str,
        new_path: &str,
        new_name: &str,
        new_parent_id: Option<i64>,
    ) -> Result<()> {
        // substr() is character-based in SQLite, so the offset must be a
        // character count, not a byte count.
        let tail_start = (old_path.chars().count() + 1) as i64;
        let pattern = subtree_pattern(old_path);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE directories SET path = ? || substr(path, ?)
             WHERE path = ? OR path LIKE ? ESCAPE '\\'",
        )
        .bind(new_path)
        .bind(tail_start)
        .bind(old_path)
        .bind(&pattern)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE files SET path = ? || substr(path, ?)
             WHERE path LIKE ? ESCAPE '\\'",
        )
        .bind(new_path)
        .bind(tail_start)
        .bind(&pattern)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE directories SET name = ?, parent_id = ?, last_modified_at = ? WHERE id = ?",
        )
        .bind(new_name)
        .bind(new_parent_id)
        .bind(now)
        .bind(dir_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a single directory record by ID, without cascading.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM directories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a directory and every descendant record in one transaction.
    ///
    /// Returns the number of deleted (file, directory) rows.
    pub async fn delete_subtree(&self, path: &str) -> Result<(u64, u64)> {
        let pattern = subtree_pattern(path);
        let mut tx = self.pool.begin().await?;

        let files = sqlx::query("DELETE FROM files WHERE path LIKE ? ESCAPE '\\'")
            .bind(&pattern)
            .execute(&mut *tx)
            .await?;

        let dirs = sqlx::query("DELETE FROM directories WHERE path = ? OR path LIKE ? ESCAPE '\\'")
            .bind(path)
            .bind(&pattern)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((files.rows_affected(), dirs.rows_affected()))
    }
}
