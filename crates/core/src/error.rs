use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// A table or schema does not match the declared form layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("table `{table}` has no identifier column `{column}`")]
    MissingIdentifierColumn { table: String, column: String },

    #[error("table `{table}` has no partition column `{column}`")]
    MissingPartitionColumn { table: String, column: String },

    #[error("column `{0}` is declared more than once")]
    DuplicateColumn(String),

    #[error("column `{0}` is not declared")]
    UndeclaredColumn(String),

    #[error("column `{0}` must be locked")]
    MustBeLocked(String),

    #[error("required column `{0}` must be editable")]
    RequiredNotEditable(String),

    #[error("audit column `{0}` collides with a declared column")]
    AuditCollision(String),

    #[error("schema declares no editable columns")]
    NoEditableColumns,
}
