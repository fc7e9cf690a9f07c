use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;
use crate::ids::RowId;

static NULL: FieldValue = FieldValue::Null;

/// One roster row: column name to cell value. Absent columns read as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.set(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> &FieldValue {
        self.cells.get(column).unwrap_or(&NULL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn set(&mut self, column: &str, value: FieldValue) {
        self.cells.insert(column.to_string(), value);
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.cells.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A table exactly as a table source hands it over: a header and rows, no
/// knowledge of which column is the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RawTable {
    pub fn new(name: &str, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows,
        }
    }

    pub fn empty(name: &str) -> Self {
        Self::new(name, Vec::new(), Vec::new())
    }

    /// A store that was never written has neither header nor rows.
    pub fn is_unwritten(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A loaded table with a known identifier column. Row order is display order
/// only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    identifier: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: &str, identifier: &str, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.to_string(),
            identifier: identifier.to_string(),
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn row_id(&self, row: &Row) -> Option<RowId> {
        RowId::from_value(row.get(&self.identifier))
    }

    /// Same table with a different row set.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            name: self.name.clone(),
            identifier: self.identifier.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn into_raw(self) -> RawTable {
        RawTable {
            name: self.name,
            columns: self.columns,
            rows: self.rows,
        }
    }
}
