use std::collections::HashMap;

use tracing::warn;

use rosterdesk_core::{FieldValue, RawTable, Row, RowId, SchemaError, Table};

use crate::error::EngineError;

/// Turns a raw table into a keyed table. Fails if the identifier column is not
/// in the header. A table that was never written loads as empty.
pub fn load(raw: RawTable, identifier: &str) -> Result<Table, SchemaError> {
    if raw.is_unwritten() {
        return Ok(Table::new(&raw.name, identifier, vec![identifier.to_string()], Vec::new()));
    }
    if !raw.has_column(identifier) {
        return Err(SchemaError::MissingIdentifierColumn {
            table: raw.name,
            column: identifier.to_string(),
        });
    }
    Ok(Table::new(&raw.name, identifier, raw.columns, raw.rows))
}

pub fn partition_matches(cell: &FieldValue, partition: &str) -> bool {
    !cell.is_null() && cell.to_string() == partition
}

/// Rows whose partition cell equals `partition`.
///
/// Matching is exact and case-sensitive: `SAF-10` and `saf-10` are different
/// units, and rows with a differently cased code fall out of the view. Keep
/// unit codes canonical upstream.
pub fn filter_by_partition(table: &Table, column: &str, partition: &str) -> Result<Table, SchemaError> {
    if !table.has_column(column) {
        return Err(SchemaError::MissingPartitionColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        });
    }
    let rows = table
        .rows()
        .iter()
        .filter(|row| partition_matches(row.get(column), partition))
        .cloned()
        .collect();
    Ok(table.with_rows(rows))
}

/// Identifier to row lookup over a borrowed table.
#[derive(Debug)]
pub struct RowIndex<'a> {
    table: &'a Table,
    positions: HashMap<RowId, usize>,
}

impl<'a> RowIndex<'a> {
    pub fn get(&self, id: &RowId) -> Option<&'a Row> {
        self.positions.get(id).map(|&i| &self.table.rows()[i])
    }

    pub fn position(&self, id: &RowId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn into_positions(self) -> HashMap<RowId, usize> {
        self.positions
    }
}

/// What `index_first_wins` had to set aside.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Later occurrences of an identifier already seen, in table order.
    pub duplicates: Vec<RowId>,
    /// Rows with a blank identifier cell.
    pub blank: usize,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.blank == 0
    }
}

fn build(table: &Table) -> (RowIndex<'_>, IndexReport) {
    let mut positions = HashMap::with_capacity(table.len());
    let mut report = IndexReport::default();
    for (i, row) in table.rows().iter().enumerate() {
        match table.row_id(row) {
            None => report.blank += 1,
            Some(id) => {
                if positions.contains_key(&id) {
                    report.duplicates.push(id);
                } else {
                    positions.insert(id, i);
                }
            }
        }
    }
    if report.blank > 0 {
        warn!(table = table.name(), rows = report.blank, "skipping rows with blank identifier");
    }
    (RowIndex { table, positions }, report)
}

/// Strict index: any repeated identifier is an error.
pub fn index(table: &Table) -> Result<RowIndex<'_>, EngineError> {
    let (index, report) = build(table);
    if !report.duplicates.is_empty() {
        return Err(EngineError::DuplicateIdentifier {
            table: table.name().to_string(),
            ids: report.duplicates,
        });
    }
    Ok(index)
}

/// Lenient index for upstream data: the first occurrence of each identifier
/// wins and later ones are logged and reported.
pub fn index_first_wins(table: &Table) -> (RowIndex<'_>, IndexReport) {
    let (index, report) = build(table);
    for id in &report.duplicates {
        warn!(table = table.name(), row_id = %id, "duplicate identifier, keeping first occurrence");
    }
    (index, report)
}
