use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS sheets (
    name TEXT PRIMARY KEY,
    columns BLOB NOT NULL,
    row_count INTEGER NOT NULL,
    checksum BLOB NOT NULL CHECK (length(checksum) = 32),
    replaced_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER))
);

CREATE TABLE IF NOT EXISTS sheet_rows (
    sheet TEXT NOT NULL REFERENCES sheets (name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    cells BLOB NOT NULL,
    PRIMARY KEY (sheet, position)
);
";
