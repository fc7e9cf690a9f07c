use rosterdesk_core::RawTable;

use crate::error::StorageError;

/// Where base and overlay tables come from. Implementations must make a
/// completed `replace_table` visible to the next `read_table`.
pub trait TableSource {
    /// Reads a whole table. A table that was never written comes back as an
    /// empty `RawTable`, not an error.
    fn read_table(&self, name: &str) -> Result<RawTable, StorageError>;

    /// Replaces the named table wholesale with `table`'s header and rows.
    fn replace_table(&mut self, name: &str, table: &RawTable) -> Result<(), StorageError>;
}

impl<T: TableSource + ?Sized> TableSource for &mut T {
    fn read_table(&self, name: &str) -> Result<RawTable, StorageError> {
        (**self).read_table(name)
    }

    fn replace_table(&mut self, name: &str, table: &RawTable) -> Result<(), StorageError> {
        (**self).replace_table(name, table)
    }
}
