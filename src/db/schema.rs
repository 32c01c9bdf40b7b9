//! Database schema migrations for Depot.
//!
//! Each entry in [`MIGRATIONS`] is one schema version, applied in order and
//! recorded in the `schema_version` table.

/// All schema migrations, oldest first.
pub const MIGRATIONS: &[&str] = &[
    // v1: directory/file index and the embedded-content blob table
    "CREATE TABLE directories (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT NOT NULL,
        path              TEXT NOT NULL UNIQUE,
        parent_id         INTEGER REFERENCES directories(id) ON DELETE SET NULL,
        created_at        TEXT NOT NULL,
        last_modified_at  TEXT NOT NULL
    );
    CREATE INDEX idx_directories_parent ON directories(parent_id);

    CREATE TABLE files (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT NOT NULL,
        path              TEXT NOT NULL UNIQUE,
        size              INTEGER NOT NULL DEFAULT 0,
        content_type      TEXT NOT NULL DEFAULT 'application/octet-stream',
        parent_id         INTEGER REFERENCES directories(id) ON DELETE SET NULL,
        created_at        TEXT NOT NULL,
        last_modified_at  TEXT NOT NULL
    );
    CREATE INDEX idx_files_parent ON files(parent_id);

    CREATE TABLE blobs (
        path           TEXT PRIMARY KEY,
        content        TEXT NOT NULL,
        content_type   TEXT NOT NULL,
        size           INTEGER NOT NULL,
        last_modified  TEXT NOT NULL
    );",
];
