//! Database schema and migrations for filestore.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records how many have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: content metadata
    r#"
-- One row per distinct content fingerprint (hex SHA-1).
-- status: 1 = active, 2 = removed. Rows are never deleted.
CREATE TABLE files (
    file_sha1   TEXT NOT NULL PRIMARY KEY,
    file_name   TEXT NOT NULL,
    file_size   INTEGER NOT NULL CHECK (file_size >= 0),
    file_addr   TEXT NOT NULL,
    status      INTEGER NOT NULL DEFAULT 1 CHECK (status IN (1, 2)),
    revision    INTEGER NOT NULL DEFAULT 0,   -- bumped on every reactivation
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_status ON files(status, updated_at);

-- Identity and size are write-once.
CREATE TRIGGER files_write_once
BEFORE UPDATE OF file_sha1, file_size ON files
WHEN NEW.file_sha1 <> OLD.file_sha1 OR NEW.file_size <> OLD.file_size
BEGIN
    SELECT RAISE(ABORT, 'file_sha1 and file_size are immutable');
END;
"#,
    // v2: users and their current token
    r#"
CREATE TABLE users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    username        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password        TEXT NOT NULL,           -- Argon2 hash
    token           TEXT,                    -- most recently issued token
    token_issued_at TEXT,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    last_active     TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1
);
"#,
];
