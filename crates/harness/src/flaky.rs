use rosterdesk_core::RawTable;
use rosterdesk_storage::{StorageError, TableSource};

/// Wraps a store and fails writes on request, the way a remote sheet does
/// when a request dies halfway through a clear-then-write.
pub struct FlakyStore<S> {
    inner: S,
    fail_next: Option<Failure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Nothing reaches the inner store.
    Clean,
    /// The table is cleared and only the first `n` rows are written.
    Partial(usize),
}

impl<S: TableSource> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_next: None,
        }
    }

    pub fn fail_next_replace(&mut self, failure: Failure) {
        self.fail_next = Some(failure);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TableSource> TableSource for FlakyStore<S> {
    fn read_table(&self, name: &str) -> Result<RawTable, StorageError> {
        self.inner.read_table(name)
    }

    fn replace_table(&mut self, name: &str, table: &RawTable) -> Result<(), StorageError> {
        match self.fail_next.take() {
            None => self.inner.replace_table(name, table),
            Some(Failure::Clean) => Err(StorageError::WriteFailed {
                table: name.to_string(),
                reason: "connection reset".into(),
            }),
            Some(Failure::Partial(n)) => {
                let mut truncated = table.clone();
                truncated.rows.truncate(n);
                self.inner.replace_table(name, &truncated)?;
                Err(StorageError::WriteFailed {
                    table: name.to_string(),
                    reason: format!("connection reset after {n} rows"),
                })
            }
        }
    }
}
