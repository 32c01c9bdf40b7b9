//! File management module for Depot.
//!
//! This module provides the hierarchical file namespace:
//! - Entry models and metadata repositories
//! - Path handling
//! - Directory tree views
//! - The file service coordinating content and metadata stores

mod entry;
mod metadata;
pub mod path;
mod service;
mod tree;

pub use entry::{DirectoryEntry, FileEntry, NewDirectory, NewFile};
pub use metadata::{path_taken, DirectoryRepository, FileRepository};
pub use service::{DownloadResult, EntryState, FileService, UploadRequest};
pub use tree::{build_from_listing, DirectoryItem, FileItem};

/// Reserved object name that keeps an empty directory observable in a
/// prefix listing. Never surfaced through any listing API.
pub const PLACEHOLDER_NAME: &str = ".placeholder";

/// Maximum length of a file or directory name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
