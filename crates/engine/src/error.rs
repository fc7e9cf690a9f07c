use std::fmt;

use rosterdesk_core::{CoreError, RowId, SchemaError};
use rosterdesk_storage::StorageError;
use thiserror::Error;

/// A required column left blank on a changed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub row: RowId,
    pub column: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row, self.column)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("duplicate identifiers in `{table}`: {}", join(.ids))]
    DuplicateIdentifier { table: String, ids: Vec<RowId> },

    #[error("row has no value in identifier column `{0}`")]
    MissingIdentifier(String),

    #[error("edited view does not match displayed view (missing: [{}], unexpected: [{}]); reload and retry", join(.missing), join(.unexpected))]
    ShapeMismatch {
        missing: Vec<RowId>,
        unexpected: Vec<RowId>,
    },

    #[error("required values missing: {}", join(.0))]
    Validation(Vec<Violation>),

    #[error("could not write `{table}`, it may be partially written; try again: {source}")]
    Persistence { table: String, source: StorageError },

    #[error("column `{0}` is locked")]
    LockedColumn(String),

    #[error("column `{0}` is not part of the form")]
    UnknownColumn(String),

    #[error("row not in view: {0}")]
    UnknownRow(RowId),
}

impl EngineError {
    /// Violations carried by a rejected save, empty for every other error.
    pub fn violations(&self) -> &[Violation] {
        match self {
            EngineError::Validation(v) => v,
            _ => &[],
        }
    }
}
