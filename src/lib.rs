//! Depot - hosted file depot
//!
//! A file/directory management service core: content lives in a pluggable
//! object store, hierarchy and metadata live in a relational index, and the
//! file service keeps the two consistent across uploads, renames, moves and
//! deletes.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod store;

pub use config::Config;
pub use db::Database;
pub use error::{DepotError, Result};
pub use file::{
    build_from_listing, DirectoryEntry, DirectoryItem, DirectoryRepository, DownloadResult,
    EntryState, FileEntry, FileItem, FileRepository, FileService, NewDirectory, NewFile,
    UploadRequest, DEFAULT_MAX_FILE_SIZE, PLACEHOLDER_NAME,
};
pub use store::{
    ContentStore, CopyStatus, DatabaseContentStore, LocalFsContentStore, MemoryContentStore,
    ObjectRef, ObjectSummary, StoredObject,
};
