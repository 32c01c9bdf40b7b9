//! End-to-end tests for the Depot file service.
//!
//! These tests drive full operation sequences (upload, mkdir, rename, move,
//! delete, list) against an in-memory database and content store, and check
//! that the two stores stay consistent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use depot::store::{
    ContentStore, CopyStatus, MemoryContentStore, ObjectRef, ObjectSummary, StoredObject,
};
use depot::{
    Database, DepotError, EntryState, FileService, LocalFsContentStore, Result, UploadRequest,
};

async fn setup_service() -> (FileService, Arc<MemoryContentStore>) {
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(MemoryContentStore::new());
    let service = FileService::new(db, store.clone());
    (service, store)
}

async fn upload(service: &FileService, dir: &str, name: &str, content: &[u8]) {
    service
        .upload(&UploadRequest::new(dir, name, content.to_vec()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_root_upload_and_listing() {
    let (service, _store) = setup_service().await;

    let content = vec![0x25u8; 512];
    service
        .upload(
            &UploadRequest::new("", "report.pdf", content.clone())
                .with_content_type("application/pdf"),
        )
        .await
        .unwrap();

    let listing = service.list_directory("").await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].name, "report.pdf");
    assert_eq!(listing.files[0].size, 512);
    assert_eq!(listing.total_size, 512);
    assert!(listing.subdirectories.is_empty());

    let downloaded = service.download("report.pdf").await.unwrap();
    assert_eq!(downloaded.content, content);
}

#[tokio::test]
async fn test_nested_upload_and_listing() {
    let (service, _store) = setup_service().await;

    service.mkdir("docs").await.unwrap();
    upload(&service, "docs", "a.txt", b"hello").await;

    let root = service.list_directory("").await.unwrap();
    assert!(root.files.is_empty());
    assert_eq!(root.subdirectories.len(), 1);
    assert_eq!(root.subdirectories[0].name, "docs");
    assert_eq!(root.subdirectories[0].file_count(), 1);

    let docs = service.list_directory("docs").await.unwrap();
    assert_eq!(docs.files.len(), 1);
    assert_eq!(docs.files[0].name, "a.txt");
}

#[tokio::test]
async fn test_subtree_rename_end_to_end() {
    let (service, _store) = setup_service().await;

    service.mkdir("docs").await.unwrap();
    service.mkdir("docs/sub").await.unwrap();
    upload(&service, "docs/sub", "b.txt", b"subtree payload").await;

    service.rename_directory("docs", "archive").await.unwrap();

    let root = service.list_directory("").await.unwrap();
    let names: Vec<&str> = root
        .subdirectories
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["archive"]);

    let sub = service.list_directory("archive/sub").await.unwrap();
    assert_eq!(sub.files.len(), 1);
    assert_eq!(sub.files[0].name, "b.txt");

    let old = service.download("docs/sub/b.txt").await;
    assert!(matches!(old, Err(DepotError::NotFound(_))));

    let moved = service.download("archive/sub/b.txt").await.unwrap();
    assert_eq!(moved.content, b"subtree payload");
}

#[tokio::test]
async fn test_subtree_move_rewrites_every_descendant() {
    let (service, store) = setup_service().await;

    service.mkdir("dest").await.unwrap();
    service.mkdir("docs").await.unwrap();
    service.mkdir("docs/sub").await.unwrap();
    upload(&service, "docs", "a.txt", b"1").await;
    upload(&service, "docs/sub", "b.txt", b"22").await;
    upload(&service, "docs/sub", "c.txt", b"333").await;

    service.move_directory("docs", "dest").await.unwrap();

    // Every descendant path is the old path with the prefix replaced, and
    // nothing is lost or duplicated.
    for (old_path, new_path, content) in [
        ("docs/a.txt", "dest/docs/a.txt", b"1".as_slice()),
        ("docs/sub/b.txt", "dest/docs/sub/b.txt", b"22".as_slice()),
        ("docs/sub/c.txt", "dest/docs/sub/c.txt", b"333".as_slice()),
    ] {
        assert!(!store.exists(old_path).await.unwrap());
        let downloaded = service.download(new_path).await.unwrap();
        assert_eq!(downloaded.content, content);
    }

    let listing = service.list_directory("dest/docs/sub").await.unwrap();
    assert_eq!(listing.files.len(), 2);
    assert_eq!(listing.total_size, 5);
}

#[tokio::test]
async fn test_move_into_own_subtree_leaves_no_trace() {
    let (service, store) = setup_service().await;

    service.mkdir("docs").await.unwrap();
    service.mkdir("docs/sub").await.unwrap();
    upload(&service, "docs", "a.txt", b"data").await;
    let before: Vec<String> = store
        .list_by_prefix("")
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.path)
        .collect();

    let result = service.move_directory("docs", "docs/sub").await;
    assert!(matches!(result, Err(DepotError::InvalidOperation(_))));

    // No observable state change on either side
    let after: Vec<String> = store
        .list_by_prefix("")
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.path)
        .collect();
    assert_eq!(before, after);
    assert!(service.download("docs/a.txt").await.is_ok());
}

#[tokio::test]
async fn test_delete_cascade_completeness() {
    let (service, store) = setup_service().await;

    service.mkdir("archive").await.unwrap();
    service.mkdir("archive/sub").await.unwrap();
    upload(&service, "archive", "a.txt", b"1").await;
    upload(&service, "archive/sub", "b.txt", b"22").await;
    upload(&service, "", "keep.txt", b"untouched").await;

    assert!(service.delete_directory("archive").await.unwrap());

    // No metadata below the deleted root survives
    let root = service.list_directory("").await.unwrap();
    assert!(root.subdirectories.is_empty());
    assert_eq!(root.files.len(), 1);
    assert_eq!(root.files[0].name, "keep.txt");

    // No content objects below the deleted root survive, placeholders
    // included
    assert!(store.list_by_prefix("archive/").await.unwrap().is_empty());
    assert_eq!(
        service.entry_state("archive").await.unwrap(),
        EntryState::Absent
    );
    assert_eq!(
        service.entry_state("archive/sub/b.txt").await.unwrap(),
        EntryState::Absent
    );
}

#[tokio::test]
async fn test_placeholder_never_surfaced() {
    let (service, store) = setup_service().await;

    service.mkdir("docs").await.unwrap();
    service.mkdir("docs/empty").await.unwrap();
    upload(&service, "docs", "a.txt", b"123").await;

    // The placeholder objects exist in the raw store...
    assert!(store.exists("docs/.placeholder").await.unwrap());
    assert!(store.exists("docs/empty/.placeholder").await.unwrap());

    // ...but never in any listing or size, metadata- or store-derived
    let metadata_view = service.list_directory("docs").await.unwrap();
    assert_eq!(metadata_view.files.len(), 1);
    assert_eq!(metadata_view.total_size, 3);

    let store_view = service.list_directory_from_store("docs").await.unwrap();
    assert_eq!(store_view.files.len(), 1);
    assert_eq!(store_view.files[0].name, "a.txt");
    assert_eq!(store_view.total_size, 3);
    // The empty child is still observable thanks to its placeholder
    assert_eq!(store_view.subdirectories.len(), 1);
    assert_eq!(store_view.subdirectories[0].name, "empty");
    assert_eq!(store_view.subdirectories[0].file_count(), 0);
}

#[tokio::test]
async fn test_mkdir_rejected_on_second_call() {
    let (service, _store) = setup_service().await;

    assert!(service.mkdir("docs").await.is_ok());
    let second = service.mkdir("docs").await;
    assert!(matches!(second, Err(DepotError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_path_namespace_shared_between_files_and_directories() {
    let (service, _store) = setup_service().await;

    upload(&service, "", "report", b"bytes").await;
    let dir_clash = service.mkdir("report").await;
    assert!(matches!(dir_clash, Err(DepotError::AlreadyExists(_))));

    service.mkdir("docs").await.unwrap();
    let file_clash = service
        .upload(&UploadRequest::new("", "docs", b"bytes".to_vec()))
        .await;
    assert!(matches!(file_clash, Err(DepotError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_local_fs_end_to_end() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(LocalFsContentStore::new(temp_dir.path()).unwrap());
    let service = FileService::new(db, store.clone());

    service.mkdir("docs").await.unwrap();
    upload(&service, "docs", "a.txt", b"local payload").await;

    let downloaded = service.download("docs/a.txt").await.unwrap();
    assert_eq!(downloaded.content, b"local payload");
    assert_eq!(downloaded.content_type, "text/plain");

    let url = service
        .download_url("docs/a.txt", Duration::from_secs(60))
        .await
        .unwrap();
    assert!(url.starts_with("file://"));

    service.rename_file("docs/a.txt", "b.txt").await.unwrap();
    assert!(store.exists("docs/b.txt").await.unwrap());
    assert!(!store.exists("docs/a.txt").await.unwrap());

    assert!(service.delete_directory("docs").await.unwrap());
    assert!(store.list_by_prefix("").await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Partial-failure behavior, exercised with a store that fails on demand
// ---------------------------------------------------------------------------

/// Content store that fails copies whose source is in the deny set.
struct FlakyStore {
    inner: MemoryContentStore,
    fail_copy_from: Mutex<HashSet<String>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryContentStore::new(),
            fail_copy_from: Mutex::new(HashSet::new()),
        }
    }

    fn fail_copies_from(&self, path: &str) {
        self.fail_copy_from
            .lock()
            .unwrap()
            .insert(path.to_string());
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectRef> {
        self.inner.put(path, data, content_type).await
    }

    async fn get(&self, path: &str) -> Result<Option<StoredObject>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        self.inner.delete(path).await
    }

    async fn begin_copy(&self, src: &str, dst: &str) -> Result<CopyStatus> {
        if self.fail_copy_from.lock().unwrap().contains(src) {
            return Err(DepotError::StoreUnavailable(format!(
                "injected copy failure for {src}"
            )));
        }
        self.inner.begin_copy(src, dst).await
    }

    async fn copy_status(&self, dst: &str) -> Result<CopyStatus> {
        self.inner.copy_status(dst).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        self.inner.list_by_prefix(prefix).await
    }
}

/// Content store whose copies never reach a terminal state.
struct StalledStore {
    inner: MemoryContentStore,
}

#[async_trait]
impl ContentStore for StalledStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectRef> {
        self.inner.put(path, data, content_type).await
    }

    async fn get(&self, path: &str) -> Result<Option<StoredObject>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        self.inner.delete(path).await
    }

    async fn begin_copy(&self, _src: &str, _dst: &str) -> Result<CopyStatus> {
        Ok(CopyStatus::Pending)
    }

    async fn copy_status(&self, _dst: &str) -> Result<CopyStatus> {
        Ok(CopyStatus::Pending)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        self.inner.list_by_prefix(prefix).await
    }
}

#[tokio::test]
async fn test_copy_wait_is_bounded() {
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(StalledStore {
        inner: MemoryContentStore::new(),
    });
    let config = depot::config::StorageConfig {
        copy_poll_interval_ms: 1,
        copy_max_polls: 3,
        ..Default::default()
    };
    let service = FileService::new(db, store).with_storage_config(&config);

    upload(&service, "", "a.txt", b"payload").await;

    let result = service.rename_file("a.txt", "b.txt").await;
    assert!(matches!(result, Err(DepotError::Timeout(_))));

    // The source metadata is untouched
    let downloaded = service.download("a.txt").await.unwrap();
    assert_eq!(downloaded.content, b"payload");
}

#[tokio::test]
async fn test_directory_rename_partial_failure() {
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(FlakyStore::new());
    let service = FileService::new(db, store.clone());

    service.mkdir("docs").await.unwrap();
    upload(&service, "docs", "a.txt", b"first").await;
    upload(&service, "docs", "z.txt", b"second").await;

    // The listing is path-ordered, so z.txt is copied after a.txt
    store.fail_copies_from("docs/z.txt");

    let result = service.rename_directory("docs", "archive").await;
    match result {
        Err(DepotError::PartialFailure { operation, detail }) => {
            assert_eq!(operation, "rename_directory");
            assert!(detail.contains("docs"));
            assert!(detail.contains("archive"));
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }

    // Metadata still points at the old paths, sources are untouched, and
    // the objects copied before the failure are left in place for cleanup.
    assert!(service.download("docs/a.txt").await.is_ok());
    assert!(service.download("docs/z.txt").await.is_ok());
    assert!(store.exists("archive/a.txt").await.unwrap());
    let listing = service.list_directory("").await.unwrap();
    assert_eq!(listing.subdirectories.len(), 1);
    assert_eq!(listing.subdirectories[0].name, "docs");
}

#[tokio::test]
async fn test_file_rename_failed_copy_leaves_source() {
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(FlakyStore::new());
    let service = FileService::new(db, store.clone());

    upload(&service, "", "a.txt", b"payload").await;
    store.fail_copies_from("a.txt");

    let result = service.rename_file("a.txt", "b.txt").await;
    assert!(matches!(result, Err(DepotError::StoreUnavailable(_))));

    // The source is untouched and still consistent
    let downloaded = service.download("a.txt").await.unwrap();
    assert_eq!(downloaded.content, b"payload");
    assert_eq!(
        service.entry_state("a.txt").await.unwrap(),
        EntryState::Consistent
    );
}
