use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("table `{table}` is corrupt: {reason}")]
    Corrupt { table: String, reason: String },

    #[error("write to `{table}` failed: {reason}")]
    WriteFailed { table: String, reason: String },

    #[error("core error: {0}")]
    Core(#[from] rosterdesk_core::CoreError),
}
