//! Content storage for Depot.
//!
//! This module defines the [`ContentStore`] capability set and its bundled
//! backends:
//! - [`LocalFsContentStore`] - objects as files under a root directory
//! - [`MemoryContentStore`] - per-process arena map, for development and tests
//! - [`DatabaseContentStore`] - content embedded as base64 text in SQLite,
//!   a fallback for environments without object storage

mod database;
mod localfs;
mod memory;

pub use database::DatabaseContentStore;
pub use localfs::LocalFsContentStore;
pub use memory::MemoryContentStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// Reference to a stored object, returned by [`ContentStore::put`].
#[derive(Debug, Clone)]
pub struct ObjectRef {
    /// Full slash-delimited object path.
    pub path: String,
    /// Opaque version tag for the stored bytes.
    pub etag: String,
    /// Size of the stored content in bytes.
    pub size: u64,
}

/// One entry of a prefix listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Full slash-delimited object path.
    pub path: String,
    /// Size of the object in bytes.
    pub size: u64,
    /// When the object was last written.
    pub last_modified: DateTime<Utc>,
}

/// A fetched object: content bytes plus the recorded content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Content bytes.
    pub content: Vec<u8>,
    /// MIME content type.
    pub content_type: String,
}

/// State of a server-side copy.
///
/// Callers must poll [`ContentStore::copy_status`] until a terminal state
/// (`Completed` or `Failed`) before deleting the copy source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyStatus {
    /// The copy has been accepted but is not yet durable.
    Pending,
    /// The copy is durably committed at the destination.
    Completed,
    /// The copy failed; the source is untouched.
    Failed(String),
}

/// Object-storage abstraction keyed by full slash-delimited paths.
///
/// Backends are plain key/value object stores: they know nothing about the
/// directory hierarchy beyond prefix listing, and offer no multi-object
/// transactionality. `delete` and `begin_copy` are idempotent so that
/// multi-object operations can be safely retried.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store an object, overwriting any existing object at the same path.
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectRef>;

    /// Fetch an object. Returns `None` if no object exists at the path.
    async fn get(&self, path: &str) -> Result<Option<StoredObject>>;

    /// Delete an object. Returns `true` if an object was actually removed.
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Start a server-side copy from `src` to `dst`.
    ///
    /// Returns the initial copy state; bundled backends complete the copy
    /// synchronously and return [`CopyStatus::Completed`] directly.
    async fn begin_copy(&self, src: &str, dst: &str) -> Result<CopyStatus>;

    /// Report the state of a copy previously started with `begin_copy`.
    async fn copy_status(&self, dst: &str) -> Result<CopyStatus>;

    /// Check whether an object exists at the path.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// List all objects whose path starts with `prefix`.
    ///
    /// Ordering is unspecified across calls but stable within one listing.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>>;

    /// Produce a time-limited read-only URL for the object, if the backend
    /// supports addressing objects by URL. Backends without signing support
    /// return a plain object URL and ignore `ttl`.
    async fn download_url(&self, _path: &str, _ttl: Duration) -> Result<Option<String>> {
        Ok(None)
    }
}
