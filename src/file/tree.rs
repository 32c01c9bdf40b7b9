//! Directory tree views.
//!
//! [`DirectoryItem`] is the one-level listing shape consumed by the UI
//! layer: the target directory, its immediate files and its immediate
//! subdirectories. Deeper levels are fetched lazily by listing again with a
//! child path.
//!
//! [`build_from_listing`] reconstructs this view from a flat prefix listing
//! of a content store, for deployments where the content store is the only
//! source of hierarchy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entry::FileEntry;
use super::{path, PLACEHOLDER_NAME};
use crate::store::ObjectSummary;

/// One file in a directory listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    /// Leaf name.
    pub name: String,
    /// Full slash-delimited path.
    pub path: String,
    /// Content size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// When the file was uploaded (unknown in listings derived from a bare
    /// content store).
    pub created_at: Option<DateTime<Utc>>,
    /// When the file was last written.
    pub last_modified_at: DateTime<Utc>,
}

impl From<FileEntry> for FileItem {
    fn from(entry: FileEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            size: entry.size.max(0) as u64,
            content_type: entry.content_type,
            created_at: Some(entry.created_at),
            last_modified_at: entry.last_modified_at,
        }
    }
}

impl From<&ObjectSummary> for FileItem {
    fn from(object: &ObjectSummary) -> Self {
        Self {
            name: path::leaf(&object.path).to_string(),
            path: object.path.clone(),
            size: object.size,
            content_type: mime_guess::from_path(&object.path)
                .first_or_octet_stream()
                .to_string(),
            created_at: None,
            last_modified_at: object.last_modified,
        }
    }
}

/// A directory plus its immediate contents, one level deep.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryItem {
    /// Leaf name ("" for the root).
    pub name: String,
    /// Full slash-delimited path ("" for the root).
    pub path: String,
    /// When the directory was created (unknown for the synthetic root and
    /// for listings derived from a bare content store).
    pub created_at: Option<DateTime<Utc>>,
    /// When the directory was last renamed or moved.
    pub last_modified_at: Option<DateTime<Utc>>,
    /// Recursive sum of descendant file sizes, placeholders excluded.
    pub total_size: u64,
    /// Files in this directory. For the target directory these are its
    /// direct files; for subdirectory entries every descendant file is
    /// attributed to the immediate child, so counts stay accurate.
    pub files: Vec<FileItem>,
    /// Immediate subdirectories.
    pub subdirectories: Vec<DirectoryItem>,
}

impl DirectoryItem {
    /// Create an empty node for a directory path.
    pub fn empty(dir_path: &str) -> Self {
        Self {
            name: path::leaf(dir_path).to_string(),
            path: dir_path.to_string(),
            created_at: None,
            last_modified_at: None,
            total_size: 0,
            files: Vec::new(),
            subdirectories: Vec::new(),
        }
    }

    /// Total number of files attributed to this node.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Reconstruct a one-level directory view from a flat prefix listing.
///
/// `dir_path` is the target directory ("" for the root); `objects` is the
/// listing of every object under `dir_path + "/"`. An empty listing yields
/// an empty-but-present node; distinguishing "exists, empty" from "does not
/// exist" needs a metadata lookup, which a bare listing cannot provide.
pub fn build_from_listing(dir_path: &str, objects: &[ObjectSummary]) -> DirectoryItem {
    let strip = if dir_path.is_empty() {
        String::new()
    } else {
        format!("{dir_path}/")
    };

    let mut node = DirectoryItem::empty(dir_path);
    // Order-preserving dedup of immediate children by first segment
    let mut child_index: HashMap<String, usize> = HashMap::new();

    for object in objects {
        let Some(relative) = object.path.strip_prefix(strip.as_str()) else {
            continue;
        };
        if relative.is_empty() {
            continue;
        }

        match relative.split_once('/') {
            None => {
                // Direct file of the target directory
                if relative == PLACEHOLDER_NAME {
                    continue;
                }
                node.total_size += object.size;
                node.files.push(FileItem::from(object));
            }
            Some((first, rest)) => {
                let index = match child_index.get(first) {
                    Some(&index) => index,
                    None => {
                        let child_path = path::join(dir_path, first);
                        node.subdirectories.push(DirectoryItem::empty(&child_path));
                        let index = node.subdirectories.len() - 1;
                        child_index.insert(first.to_string(), index);
                        index
                    }
                };

                // Attribute every deeper file to the immediate child; the
                // placeholder makes an empty child observable but is never
                // surfaced itself.
                if path::leaf(rest) == PLACEHOLDER_NAME {
                    continue;
                }
                let child = &mut node.subdirectories[index];
                child.total_size += object.size;
                child.files.push(FileItem::from(object));
                node.total_size += object.size;
            }
        }
    }

    node
}
