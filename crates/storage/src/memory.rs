use std::collections::HashMap;

use tracing::warn;

use rosterdesk_core::RawTable;

use crate::error::StorageError;
use crate::traits::TableSource;

/// In-process table source. Useful for tests and for callers that fetch the
/// tables themselves and only want the reconciliation logic.
#[derive(Debug, Clone, Default)]
pub struct MemoryTableStore {
    tables: HashMap<String, RawTable>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: RawTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

impl TableSource for MemoryTableStore {
    fn read_table(&self, name: &str) -> Result<RawTable, StorageError> {
        match self.tables.get(name) {
            Some(table) => Ok(table.clone()),
            None => {
                warn!(table = name, "table not found, reading as empty");
                Ok(RawTable::empty(name))
            }
        }
    }

    fn replace_table(&mut self, name: &str, table: &RawTable) -> Result<(), StorageError> {
        let mut stored = table.clone();
        stored.name = name.to_string();
        self.tables.insert(name.to_string(), stored);
        Ok(())
    }
}
