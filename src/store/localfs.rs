//! Local filesystem content store.
//!
//! Objects are plain files under a root directory; the object path is the
//! path relative to that root. Useful for single-node deployments and as a
//! stand-in for a remote object store in development.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use url::Url;
use uuid::Uuid;

use super::{ContentStore, CopyStatus, ObjectRef, ObjectSummary, StoredObject};
use crate::Result;

/// Content store keeping objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalFsContentStore {
    root: PathBuf,
}

impl LocalFsContentStore {
    /// Create a new store rooted at the given directory.
    ///
    /// The root directory will be created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Get the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Remove empty directories left behind by deleted objects.
    ///
    /// Returns the number of directories removed.
    pub async fn cleanup_empty_dirs(&self) -> Result<usize> {
        let mut removed = 0;
        let mut stack = vec![self.root.clone()];
        let mut dirs = Vec::new();

        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    stack.push(entry.path());
                }
            }
            dirs.push(dir);
        }

        // Deepest first, so an emptied parent is removable in the same pass
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            if dir == self.root {
                continue;
            }
            let mut entries = fs::read_dir(&dir).await?;
            if entries.next_entry().await?.is_none() && fs::remove_dir(&dir).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl ContentStore for LocalFsContentStore {
    async fn put(&self, path: &str, data: &[u8], _content_type: &str) -> Result<ObjectRef> {
        let file_path = self.path_for(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file_path, data).await?;

        Ok(ObjectRef {
            path: path.to_string(),
            etag: Uuid::new_v4().to_string(),
            size: data.len() as u64,
        })
    }

    async fn get(&self, path: &str) -> Result<Option<StoredObject>> {
        let file_path = self.path_for(path);
        match fs::read(&file_path).await {
            Ok(content) => {
                // The filesystem does not persist MIME metadata, so the
                // content type is inferred from the object name on read.
                let content_type = mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .to_string();
                Ok(Some(StoredObject {
                    content,
                    content_type,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let file_path = self.path_for(path);
        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn begin_copy(&self, src: &str, dst: &str) -> Result<CopyStatus> {
        let src_path = self.path_for(src);
        let dst_path = self.path_for(dst);

        match fs::read(&src_path).await {
            Ok(content) => {
                if let Some(parent) = dst_path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&dst_path, content).await?;
                Ok(CopyStatus::Completed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(CopyStatus::Failed(format!("source object {src} not found")))
            }
            Err(e) => Err(e.into()),
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
        match fs::metadata(self.path_for(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut listing = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(entry_path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let relative: String = entry_path
                    .strip_prefix(&self.root)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if !relative.starts_with(prefix) {
                    continue;
                }

                let meta = entry.metadata().await?;
                let last_modified = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());

                listing.push(ObjectSummary {
                    path: relative,
                    size: meta.len(),
                    last_modified,
                });
            }
        }

        // Stable order within one listing pass
        listing.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listing)
    }

    async fn download_url(&self, path: &str, _ttl: Duration) -> Result<Option<String>> {
        // No signing support: fall back to a plain (non-expiring) file URL.
        let file_path = self.path_for(path);
        match fs::canonicalize(&file_path).await {
            Ok(absolute) => Ok(Url::from_file_path(&absolute)
                .ok()
                .map(|url| url.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
