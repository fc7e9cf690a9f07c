use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use rosterdesk_core::{RawTable, Row};

use crate::error::StorageError;
use crate::traits::TableSource;

/// Fixed-size view of a stored digest.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn encode_row(row: &Row) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec(row).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_row(bytes: &[u8]) -> Result<Row, StorageError> {
    rmp_serde::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Digest over the encoded rows in position order. Each blob is length
/// prefixed so that moving bytes between adjacent rows changes the digest.
fn checksum<'a>(blobs: impl Iterator<Item = &'a [u8]>) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for blob in blobs {
        hasher.update(&(blob.len() as u64).to_be_bytes());
        hasher.update(blob);
    }
    *hasher.finalize().as_bytes()
}

/// Table store on a single SQLite file. Each replace runs in one transaction,
/// so a reader never sees half of a write.
pub struct SqliteTableStore {
    conn: Connection,
}

impl SqliteTableStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn table_names(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT name FROM sheets ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl TableSource for SqliteTableStore {
    fn read_table(&self, name: &str) -> Result<RawTable, StorageError> {
        // Metadata and rows must come from the same snapshot, or a replace
        // committed in between looks like corruption.
        let tx = self.conn.unchecked_transaction()?;
        let meta: Option<(Vec<u8>, i64, Vec<u8>)> = tx
            .query_row(
                "SELECT columns, row_count, checksum FROM sheets WHERE name = ?1",
                rusqlite::params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((columns_bytes, row_count, checksum_bytes)) = meta else {
            warn!(table = name, "table not found, reading as empty");
            return Ok(RawTable::empty(name));
        };

        let columns: Vec<String> = rmp_serde::from_slice(&columns_bytes)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let expected = to_array::<32>(checksum_bytes, "checksum")?;

        let blobs = {
            let mut stmt = tx.prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY position")?;
            let blobs = stmt
                .query_map(rusqlite::params![name], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            blobs
        };
        tx.commit()?;

        if blobs.len() as i64 != row_count {
            return Err(StorageError::Corrupt {
                table: name.to_string(),
                reason: format!("expected {row_count} rows, found {}", blobs.len()),
            });
        }
        if checksum(blobs.iter().map(Vec::as_slice)) != expected {
            return Err(StorageError::Corrupt {
                table: name.to_string(),
                reason: "row checksum mismatch".into(),
            });
        }

        let rows = blobs
            .iter()
            .map(|b| decode_row(b))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(table = name, rows = rows.len(), "read table");
        Ok(RawTable::new(name, columns, rows))
    }

    fn replace_table(&mut self, name: &str, table: &RawTable) -> Result<(), StorageError> {
        let blobs = table
            .rows
            .iter()
            .map(encode_row)
            .collect::<Result<Vec<_>, _>>()?;
        let columns_bytes = rmp_serde::to_vec(&table.columns)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let digest = checksum(blobs.iter().map(Vec::as_slice));

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sheets (name, columns, row_count, checksum) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET columns = excluded.columns, row_count = excluded.row_count,
                 checksum = excluded.checksum,
                 replaced_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
            rusqlite::params![name, columns_bytes, blobs.len() as i64, &digest[..]],
        )?;
        tx.execute("DELETE FROM sheet_rows WHERE sheet = ?1", rusqlite::params![name])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO sheet_rows (sheet, position, cells) VALUES (?1, ?2, ?3)",
            )?;
            for (position, blob) in blobs.iter().enumerate() {
                insert.execute(rusqlite::params![name, position as i64, blob])?;
            }
        }
        tx.commit()?;

        debug!(table = name, rows = blobs.len(), "replaced table");
        Ok(())
    }
}
