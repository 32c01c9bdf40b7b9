//! File and directory entry models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::path;

/// A file record in the metadata index.
///
/// The `path` is the join key into the content store; the index holds no
/// content bytes itself.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Unique file ID.
    pub id: i64,
    /// Leaf name (final path segment).
    pub name: String,
    /// Full slash-delimited path, unique across files and directories.
    pub path: String,
    /// Content size in bytes.
    pub size: i64,
    /// MIME content type.
    pub content_type: String,
    /// Containing directory ID (None for root-level files or files whose
    /// parent directory has no index record).
    pub parent_id: Option<i64>,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
    /// When the file was last renamed, moved or rewritten.
    pub last_modified_at: DateTime<Utc>,
}

/// A directory record in the metadata index.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Unique directory ID.
    pub id: i64,
    /// Leaf name (final path segment).
    pub name: String,
    /// Full slash-delimited path, unique across files and directories.
    pub path: String,
    /// Parent directory ID (None for root-level directories).
    pub parent_id: Option<i64>,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last renamed or moved.
    pub last_modified_at: DateTime<Utc>,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Leaf name, derived from the path.
    pub name: String,
    /// Full slash-delimited path.
    pub path: String,
    /// Content size in bytes.
    pub size: i64,
    /// MIME content type.
    pub content_type: String,
    /// Containing directory ID, if indexed.
    pub parent_id: Option<i64>,
}

impl NewFile {
    /// Create a new NewFile for the given path.
    pub fn new(path: impl Into<String>, size: i64) -> Self {
        let path = path.into();
        Self {
            name: path::leaf(&path).to_string(),
            path,
            size,
            content_type: "application/octet-stream".to_string(),
            parent_id: None,
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set the containing directory.
    pub fn with_parent(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Data for creating a new directory record.
#[derive(Debug, Clone)]
pub struct NewDirectory {
    /// Leaf name, derived from the path.
    pub name: String,
    /// Full slash-delimited path.
    pub path: String,
    /// Parent directory ID, if indexed.
    pub parent_id: Option<i64>,
}

impl NewDirectory {
    /// Create a new NewDirectory for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path::leaf(&path).to_string(),
            path,
            parent_id: None,
        }
    }

    /// Set the parent directory.
    pub fn with_parent(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }
}
