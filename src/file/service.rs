//! File service for Depot.
//!
//! This module implements every user-facing file-system operation by
//! sequencing content-store and metadata-store calls:
//! - Upload and download with collision and consistency checks
//! - Directory creation, listing and recursive deletion
//! - Rename and move for files and whole subtrees
//!
//! The two stores share no transaction, so each operation orders its steps
//! to keep the inconsistency window small and compensates where it can.
//! Failures that leave the stores disagreeing surface as `PartialFailure`
//! with both sides logged.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::entry::{DirectoryEntry, FileEntry, NewDirectory, NewFile};
use super::metadata::{self, DirectoryRepository, FileRepository};
use super::tree::{self, DirectoryItem, FileItem};
use super::{path, DEFAULT_MAX_FILE_SIZE, PLACEHOLDER_NAME};
use crate::config::StorageConfig;
use crate::db::Database;
use crate::store::{ContentStore, CopyStatus};
use crate::{DepotError, Result};

/// Request data for a file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Directory to upload into ("" for the root).
    pub directory_path: String,
    /// File name.
    pub filename: String,
    /// MIME content type; inferred from the filename when not given.
    pub content_type: Option<String>,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(
        directory_path: impl Into<String>,
        filename: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            directory_path: directory_path.into(),
            filename: filename.into(),
            content_type: None,
            content,
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// The metadata record, when one exists for the path.
    pub entry: Option<FileEntry>,
    /// File content.
    pub content: Vec<u8>,
    /// MIME content type.
    pub content_type: String,
}

/// Observed consistency state of a path across the two stores.
///
/// `Absent` and `Consistent` are the steady states; the other two are
/// failure states that reads tolerate and that reconciliation tooling can
/// look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Neither store knows the path.
    Absent,
    /// Content exists without a metadata record.
    ContentOnly,
    /// A metadata record exists without content.
    MetadataOnly,
    /// Both sides agree.
    Consistent,
}

/// File service coordinating the content store and the metadata index.
pub struct FileService {
    db: Database,
    store: Arc<dyn ContentStore>,
    max_file_size: u64,
    copy_poll_interval: Duration,
    copy_max_polls: u32,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(db: Database, store: Arc<dyn ContentStore>) -> Self {
        Self {
            db,
            store,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            copy_poll_interval: Duration::from_millis(100),
            copy_max_polls: 50,
        }
    }

    /// Create a new FileService with limits and poll settings from config.
    pub fn with_storage_config(mut self, config: &StorageConfig) -> Self {
        self.max_file_size = config.max_upload_size_mb * 1024 * 1024;
        self.copy_poll_interval = Duration::from_millis(config.copy_poll_interval_ms);
        self.copy_max_polls = config.copy_max_polls;
        self
    }

    /// Set a custom max file size in bytes.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Get the configured max file size.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    fn directories(&self) -> DirectoryRepository<'_> {
        DirectoryRepository::new(self.db.pool())
    }

    /// Upload a file into a directory.
    ///
    /// The path must be free: uploads never overwrite, unlike a raw object
    /// store. Content is written first; if the metadata insert then fails,
    /// the orphaned object is deleted again.
    pub async fn upload(&self, request: &UploadRequest) -> Result<FileEntry> {
        path::validate_name(&request.filename)?;
        let dir_path = path::normalize(&request.directory_path)?;
        let full_path = path::join(&dir_path, &request.filename);

        if request.content.len() as u64 > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(DepotError::Validation(format!(
                "file exceeds the maximum upload size of {max_mb}MB"
            )));
        }

        if metadata::path_taken(self.db.pool(), &full_path).await? {
            return Err(DepotError::AlreadyExists(full_path));
        }

        let content_type = match &request.content_type {
            Some(content_type) => content_type.clone(),
            None => mime_guess::from_path(&request.filename)
                .first_or_octet_stream()
                .to_string(),
        };
        let parent_id = self.resolve_parent(&dir_path).await?;

        // Content first; the metadata record must never reference bytes
        // that were not durably written.
        self.store
            .put(&full_path, &request.content, &content_type)
            .await?;

        let new_file = NewFile::new(full_path.clone(), request.content.len() as i64)
            .with_content_type(content_type.as_str())
            .with_parent(parent_id);

        match self.files().insert(&new_file).await {
            Ok(entry) => {
                info!("uploaded {} ({} bytes)", entry.path, entry.size);
                Ok(entry)
            }
            Err(insert_err) => {
                warn!("metadata insert for {full_path} failed; deleting uploaded content");
                match self.store.delete(&full_path).await {
                    Ok(_) => Err(insert_err),
                    Err(delete_err) => {
                        error!(
                            "orphaned content at {full_path}: metadata insert failed \
                             ({insert_err}) and compensating delete failed ({delete_err})"
                        );
                        Err(DepotError::PartialFailure {
                            operation: "upload".to_string(),
                            detail: format!(
                                "content written to {full_path} but metadata insert failed \
                                 ({insert_err}) and compensating delete failed ({delete_err})"
                            ),
                        })
                    }
                }
            }
        }
    }

    /// Download a file's content.
    ///
    /// Returns `NotFound` if the object is absent or empty. A metadata
    /// record whose content is gone degrades to `NotFound` as well.
    pub async fn download(&self, file_path: &str) -> Result<DownloadResult> {
        let file_path = self.normalize_entry_path(file_path)?;
        let entry = self.files().get_by_path(&file_path).await?;

        match self.store.get(&file_path).await? {
            Some(object) if !object.content.is_empty() => {
                let content_type = entry
                    .as_ref()
                    .map(|e| e.content_type.clone())
                    .unwrap_or_else(|| object.content_type.clone());
                Ok(DownloadResult {
                    entry,
                    content: object.content,
                    content_type,
                })
            }
            _ => {
                if entry.is_some() {
                    warn!("metadata references {file_path} but no content is stored");
                }
                Err(DepotError::NotFound(format!("file {file_path}")))
            }
        }
    }

    /// Produce a time-limited download URL for a file.
    pub async fn download_url(&self, file_path: &str, ttl: Duration) -> Result<String> {
        let file_path = self.normalize_entry_path(file_path)?;

        if !self.store.exists(&file_path).await? {
            return Err(DepotError::NotFound(format!("file {file_path}")));
        }
        match self.store.download_url(&file_path, ttl).await? {
            Some(url) => Ok(url),
            None => Err(DepotError::InvalidOperation(
                "content store does not expose download URLs".to_string(),
            )),
        }
    }

    /// Create a directory.
    ///
    /// A placeholder object is written so the empty directory stays
    /// observable in prefix listings. A parent directory without an index
    /// record is tolerated; the new record then carries no parent link.
    pub async fn mkdir(&self, dir_path: &str) -> Result<DirectoryEntry> {
        let dir_path = self.normalize_entry_path(dir_path)?;

        if metadata::path_taken(self.db.pool(), &dir_path).await? {
            return Err(DepotError::AlreadyExists(dir_path));
        }
        let parent_id = self.resolve_parent(path::parent(&dir_path)).await?;

        let placeholder = format!("{dir_path}/{PLACEHOLDER_NAME}");
        self.store
            .put(&placeholder, &[], "application/octet-stream")
            .await?;

        let new_dir = NewDirectory::new(dir_path.clone()).with_parent(parent_id);
        match self.directories().insert(&new_dir).await {
            Ok(dir) => {
                info!("created directory {}", dir.path);
                Ok(dir)
            }
            Err(insert_err) => match self.store.delete(&placeholder).await {
                Ok(_) => Err(insert_err),
                Err(delete_err) => {
                    error!(
                        "orphaned placeholder at {placeholder}: metadata insert failed \
                         ({insert_err}) and compensating delete failed ({delete_err})"
                    );
                    Err(DepotError::PartialFailure {
                        operation: "mkdir".to_string(),
                        detail: format!(
                            "placeholder written to {placeholder} but metadata insert failed \
                             ({insert_err}) and compensating delete failed ({delete_err})"
                        ),
                    })
                }
            },
        }
    }

    /// Delete a file.
    ///
    /// Content is deleted first: a metadata record without content
    /// self-heals to `NotFound` on read, while content without a record
    /// would be orphaned.
    pub async fn delete_file(&self, file_path: &str) -> Result<bool> {
        let file_path = self.normalize_entry_path(file_path)?;
        let entry = self
            .files()
            .get_by_path(&file_path)
            .await?
            .ok_or_else(|| DepotError::NotFound(format!("file {file_path}")))?;

        match self.store.delete(&file_path).await {
            Ok(true) => {}
            Ok(false) => warn!("content for {file_path} was already missing"),
            Err(e) => return Err(e),
        }

        let deleted = self.files().delete(entry.id).await?;
        info!("deleted file {file_path}");
        Ok(deleted)
    }

    /// Recursively delete a directory.
    ///
    /// Every object under the path (placeholders included) is deleted from
    /// the content store, then all file and directory records of the
    /// subtree are removed in one transaction. Returns `Ok(true)` even for
    /// an empty directory, as long as it existed.
    pub async fn delete_directory(&self, dir_path: &str) -> Result<bool> {
        let dir_path = self.normalize_entry_path(dir_path)?;
        if self.directories().get_by_path(&dir_path).await?.is_none() {
            return Err(DepotError::NotFound(format!("directory {dir_path}")));
        }

        let prefix = format!("{dir_path}/");
        let objects = self.store.list_by_prefix(&prefix).await?;
        let total = objects.len();

        for (deleted, object) in objects.iter().enumerate() {
            if let Err(e) = self.store.delete(&object.path).await {
                error!(
                    "aborting delete of directory {dir_path}: failed to delete {} ({e})",
                    object.path
                );
                return Err(DepotError::PartialFailure {
                    operation: "delete_directory".to_string(),
                    detail: format!(
                        "deleted {deleted} of {total} objects under {prefix} before {} failed: {e}",
                        object.path
                    ),
                });
            }
        }

        let (files_deleted, dirs_deleted) = self.directories().delete_subtree(&dir_path).await?;
        info!(
            "deleted directory {dir_path} ({files_deleted} files, {dirs_deleted} directories, \
             {total} objects)"
        );
        Ok(true)
    }

    /// Rename a file in place.
    pub async fn rename_file(&self, file_path: &str, new_name: &str) -> Result<FileEntry> {
        let file_path = self.normalize_entry_path(file_path)?;
        path::validate_name(new_name)?;

        let entry = self
            .files()
            .get_by_path(&file_path)
            .await?
            .ok_or_else(|| DepotError::NotFound(format!("file {file_path}")))?;

        let new_path = path::join(path::parent(&file_path), new_name);
        if new_path == file_path {
            return Ok(entry);
        }
        if metadata::path_taken(self.db.pool(), &new_path).await? {
            return Err(DepotError::AlreadyExists(new_path));
        }

        self.relocate_file(entry, new_path, "rename_file").await
    }

    /// Move a file into another directory.
    ///
    /// The destination must exist as a directory record, or be the root.
    pub async fn move_file(&self, file_path: &str, dest_dir: &str) -> Result<FileEntry> {
        let file_path = self.normalize_entry_path(file_path)?;
        let dest_dir = path::normalize(dest_dir)?;

        let entry = self
            .files()
            .get_by_path(&file_path)
            .await?
            .ok_or_else(|| DepotError::NotFound(format!("file {file_path}")))?;

        if !dest_dir.is_empty() && self.directories().get_by_path(&dest_dir).await?.is_none() {
            return Err(DepotError::NotFound(format!("directory {dest_dir}")));
        }

        let new_path = path::join(&dest_dir, &entry.name);
        if new_path == file_path {
            return Ok(entry);
        }
        if metadata::path_taken(self.db.pool(), &new_path).await? {
            return Err(DepotError::AlreadyExists(new_path));
        }

        self.relocate_file(entry, new_path, "move_file").await
    }

    /// Rename a directory, rewriting the whole subtree.
    pub async fn rename_directory(&self, dir_path: &str, new_name: &str) -> Result<DirectoryEntry> {
        let dir_path = self.normalize_entry_path(dir_path)?;
        path::validate_name(new_name)?;

        let dir = self
            .directories()
            .get_by_path(&dir_path)
            .await?
            .ok_or_else(|| DepotError::NotFound(format!("directory {dir_path}")))?;

        let new_path = path::join(path::parent(&dir_path), new_name);
        if new_path == dir_path {
            return Ok(dir);
        }
        if metadata::path_taken(self.db.pool(), &new_path).await? {
            return Err(DepotError::AlreadyExists(new_path));
        }

        let parent_id = dir.parent_id;
        self.relocate_directory(dir, new_path, parent_id, "rename_directory")
            .await
    }

    /// Move a directory (and its whole subtree) into another directory.
    ///
    /// Moving a directory into itself or one of its descendants is rejected
    /// before anything is mutated.
    pub async fn move_directory(&self, dir_path: &str, dest_dir: &str) -> Result<DirectoryEntry> {
        let dir_path = self.normalize_entry_path(dir_path)?;
        let dest_dir = path::normalize(dest_dir)?;

        if path::is_within(&dest_dir, &dir_path) {
            return Err(DepotError::InvalidOperation(format!(
                "cannot move directory {dir_path} into {dest_dir}"
            )));
        }

        let dir = self
            .directories()
            .get_by_path(&dir_path)
            .await?
            .ok_or_else(|| DepotError::NotFound(format!("directory {dir_path}")))?;

        let new_parent_id = if dest_dir.is_empty() {
            None
        } else {
            let dest = self
                .directories()
                .get_by_path(&dest_dir)
                .await?
                .ok_or_else(|| DepotError::NotFound(format!("directory {dest_dir}")))?;
            Some(dest.id)
        };

        let new_path = path::join(&dest_dir, &dir.name);
        if new_path == dir_path {
            return Ok(dir);
        }
        if metadata::path_taken(self.db.pool(), &new_path).await? {
            return Err(DepotError::AlreadyExists(new_path));
        }

        self.relocate_directory(dir, new_path, new_parent_id, "move_directory")
            .await
    }

    /// List a directory one level deep, from the metadata index.
    ///
    /// Subdirectory entries carry every descendant file and the recursive
    /// size of their subtree.
    pub async fn list_directory(&self, dir_path: &str) -> Result<DirectoryItem> {
        let dir_path = path::normalize(dir_path)?;
        let files = self.files();
        let directories = self.directories();

        let mut node = if dir_path.is_empty() {
            DirectoryItem::empty("")
        } else {
            let dir = directories
                .get_by_path(&dir_path)
                .await?
                .ok_or_else(|| DepotError::NotFound(format!("directory {dir_path}")))?;
            let mut node = DirectoryItem::empty(&dir_path);
            node.created_at = Some(dir.created_at);
            node.last_modified_at = Some(dir.last_modified_at);
            node
        };

        node.total_size = files.sum_sizes_under(&dir_path).await?.max(0) as u64;
        node.files = files
            .list_direct_under(&dir_path)
            .await?
            .into_iter()
            .map(FileItem::from)
            .collect();

        for child in directories.list_direct_under(&dir_path).await? {
            let mut child_node = DirectoryItem::empty(&child.path);
            child_node.created_at = Some(child.created_at);
            child_node.last_modified_at = Some(child.last_modified_at);

            let descendants = files.list_subtree(&child.path).await?;
            child_node.total_size = descendants.iter().map(|f| f.size.max(0) as u64).sum();
            child_node.files = descendants.into_iter().map(FileItem::from).collect();
            node.subdirectories.push(child_node);
        }

        Ok(node)
    }

    /// List a directory one level deep, reconstructed from a content-store
    /// prefix listing.
    ///
    /// For deployments where the content store is the only source of
    /// hierarchy. A listing alone cannot prove the existence of an empty
    /// directory without its placeholder; use [`FileService::entry_state`]
    /// when that distinction matters.
    pub async fn list_directory_from_store(&self, dir_path: &str) -> Result<DirectoryItem> {
        let dir_path = path::normalize(dir_path)?;
        let prefix = if dir_path.is_empty() {
            String::new()
        } else {
            format!("{dir_path}/")
        };
        let objects = self.store.list_by_prefix(&prefix).await?;
        Ok(tree::build_from_listing(&dir_path, &objects))
    }

    /// Report which sides of the two stores know a path.
    pub async fn entry_state(&self, entry_path: &str) -> Result<EntryState> {
        let entry_path = self.normalize_entry_path(entry_path)?;

        let has_metadata = self.files().get_by_path(&entry_path).await?.is_some()
            || self.directories().get_by_path(&entry_path).await?.is_some();
        let has_content = self.store.exists(&entry_path).await?
            || self
                .store
                .exists(&format!("{entry_path}/{PLACEHOLDER_NAME}"))
                .await?;

        Ok(match (has_content, has_metadata) {
            (false, false) => EntryState::Absent,
            (true, false) => EntryState::ContentOnly,
            (false, true) => EntryState::MetadataOnly,
            (true, true) => EntryState::Consistent,
        })
    }

    /// Normalize a path that must name an entry (not the root).
    fn normalize_entry_path(&self, entry_path: &str) -> Result<String> {
        let normalized = path::normalize(entry_path)?;
        if normalized.is_empty() {
            return Err(DepotError::InvalidOperation(
                "path must not be empty".to_string(),
            ));
        }
        Ok(normalized)
    }

    /// Resolve the directory record for a parent path, tolerating a missing
    /// record ("" and unindexed parents both resolve to no parent link).
    async fn resolve_parent(&self, dir_path: &str) -> Result<Option<i64>> {
        if dir_path.is_empty() {
            return Ok(None);
        }
        match self.directories().get_by_path(dir_path).await? {
            Some(dir) => Ok(Some(dir.id)),
            None => {
                debug!("no index record for parent directory {dir_path}");
                Ok(None)
            }
        }
    }

    /// Wait for a copy to reach a terminal state, with a bounded poll
    /// budget.
    async fn await_copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut status = self.store.begin_copy(src, dst).await?;
        let mut polls = 0u32;
        loop {
            match status {
                CopyStatus::Completed => return Ok(()),
                CopyStatus::Failed(reason) => {
                    return Err(DepotError::StoreUnavailable(format!(
                        "copy {src} -> {dst} failed: {reason}"
                    )))
                }
                CopyStatus::Pending => {
                    if polls >= self.copy_max_polls {
                        return Err(DepotError::Timeout(format!(
                            "copy {src} -> {dst} did not complete after {} polls",
                            self.copy_max_polls
                        )));
                    }
                    polls += 1;
                    tokio::time::sleep(self.copy_poll_interval).await;
                    status = self.store.copy_status(dst).await?;
                }
            }
        }
    }

    /// Copy-then-delete a single file's content, then rewrite its record.
    async fn relocate_file(
        &self,
        entry: FileEntry,
        new_path: String,
        operation: &str,
    ) -> Result<FileEntry> {
        let new_parent_id = self.resolve_parent(path::parent(&new_path)).await?;

        self.await_copy(&entry.path, &new_path).await?;

        if let Err(e) = self.store.delete(&entry.path).await {
            // The copy is durable; the stale source is a harmless duplicate
            // awaiting cleanup, not something to roll back.
            warn!("stale content left at {} after {operation} ({e})", entry.path);
        }

        let new_name = path::leaf(&new_path).to_string();
        match self
            .files()
            .update_location(entry.id, &new_path, &new_name, new_parent_id)
            .await
        {
            Ok(true) => {
                info!("{operation}: {} -> {new_path}", entry.path);
                self.files()
                    .get_by_id(entry.id)
                    .await?
                    .ok_or_else(|| DepotError::NotFound(format!("file {new_path}")))
            }
            Ok(false) => Err(DepotError::NotFound(format!("file {}", entry.path))),
            Err(e) => {
                error!(
                    "{operation}: content moved to {new_path} but metadata still points at {} \
                     ({e})",
                    entry.path
                );
                Err(DepotError::PartialFailure {
                    operation: operation.to_string(),
                    detail: format!(
                        "content copied from {} to {new_path} but the metadata update failed: {e}",
                        entry.path
                    ),
                })
            }
        }
    }

    /// Copy-then-delete every descendant object, then rewrite the subtree's
    /// records in one transaction.
    async fn relocate_directory(
        &self,
        dir: DirectoryEntry,
        new_path: String,
        new_parent_id: Option<i64>,
        operation: &str,
    ) -> Result<DirectoryEntry> {
        let old_prefix = format!("{}/", dir.path);
        let objects = self.store.list_by_prefix(&old_prefix).await?;
        let total = objects.len();

        // Copy everything before deleting anything. A failure partway
        // aborts the remaining copies; objects already copied stay in place
        // for later cleanup rather than being rolled back.
        let mut copied = 0usize;
        for object in &objects {
            let dst = format!("{new_path}{}", &object.path[dir.path.len()..]);
            if let Err(e) = self.await_copy(&object.path, &dst).await {
                if copied == 0 {
                    return Err(e);
                }
                error!(
                    "{operation}: aborting after {copied} of {total} copies; {} -> {dst} \
                     failed ({e})",
                    object.path
                );
                return Err(DepotError::PartialFailure {
                    operation: operation.to_string(),
                    detail: format!(
                        "copied {copied} of {total} objects from {} to {new_path} before {} \
                         failed: {e}",
                        dir.path, object.path
                    ),
                });
            }
            copied += 1;
        }

        for object in &objects {
            if let Err(e) = self.store.delete(&object.path).await {
                warn!("stale content left at {} after {operation} ({e})", object.path);
            }
        }

        let new_name = path::leaf(&new_path).to_string();
        if let Err(e) = self
            .directories()
            .rename_subtree(dir.id, &dir.path, &new_path, &new_name, new_parent_id)
            .await
        {
            error!(
                "{operation}: content moved under {new_path} but metadata still points at {} \
                 ({e})",
                dir.path
            );
            return Err(DepotError::PartialFailure {
                operation: operation.to_string(),
                detail: format!(
                    "{total} objects copied from {} to {new_path} but the metadata rewrite \
                     failed: {e}",
                    dir.path
                ),
            });
        }

        info!("{operation}: {} -> {new_path} ({total} objects)", dir.path);
        self.directories()
            .get_by_id(dir.id)
            .await?
            .ok_or_else(|| DepotError::NotFound(format!("directory {new_path}")))
    }
}
