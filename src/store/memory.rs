//! In-memory content store.
//!
//! Holds all objects in a per-process map. Used in tests, in development and
//! in deployments that keep file content in the metadata database only (the
//! map then acts as a read-through scratch space).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ContentStore, CopyStatus, ObjectRef, ObjectSummary, StoredObject};
use crate::Result;

#[derive(Debug, Clone)]
struct StoredEntry {
    content: Vec<u8>,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// Content store backed by an in-process map.
///
/// Constructed once per process and shared by handle; there is no ambient
/// global instance.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    objects: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Check whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectRef> {
        let mut objects = self.objects.write().unwrap();
        objects.insert(
            path.to_string(),
            StoredEntry {
                content: data.to_vec(),
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );

        Ok(ObjectRef {
            path: path.to_string(),
            etag: Uuid::new_v4().to_string(),
            size: data.len() as u64,
        })
    }

    async fn get(&self, path: &str) -> Result<Option<StoredObject>> {
        let objects = self.objects.read().unwrap();
        Ok(objects.get(path).map(|entry| StoredObject {
            content: entry.content.clone(),
            content_type: entry.content_type.clone(),
        }))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let mut objects = self.objects.write().unwrap();
        Ok(objects.remove(path).is_some())
    }

    async fn begin_copy(&self, src: &str, dst: &str) -> Result<CopyStatus> {
        let mut objects = self.objects.write().unwrap();
        match objects.get(src).cloned() {
            Some(mut entry) => {
                entry.last_modified = Utc::now();
                objects.insert(dst.to_string(), entry);
                Ok(CopyStatus::Completed)
            }
            None => Ok(CopyStatus::Failed(format!("source object {src} not found"))),
        }
    }

    async fn copy_status(&self, dst: &str) -> Result<CopyStatus> {
        let objects = self.objects.read().unwrap();
        if objects.contains_key(dst) {
            Ok(CopyStatus::Completed)
        } else {
            Ok(CopyStatus::Failed(format!(
                "no copy destination at {dst}"
            )))
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let objects = self.objects.read().unwrap();
        Ok(objects.contains_key(path))
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let objects = self.objects.read().unwrap();
        let mut listing: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, entry)| ObjectSummary {
                path: path.clone(),
                size: entry.content.len() as u64,
                last_modified: entry.last_modified,
            })
            .collect();

        // Stable order within one listing pass
        listing.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listing)
    }
}
