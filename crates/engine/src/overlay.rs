use std::collections::HashMap;

use tracing::debug;

use rosterdesk_core::{ColumnClass, ColumnSpec, FieldValue, FormSchema, Row, RowId, Table};

use crate::error::EngineError;
use crate::row_store::index_first_wins;

/// Base rows with overlay corrections applied, restricted to the declared
/// columns. Ephemeral: rebuilt for every interaction, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedView {
    identifier: String,
    columns: Vec<ColumnSpec>,
    rows: Vec<Row>,
    positions: HashMap<RowId, usize>,
}

impl MergedView {
    fn empty(schema: &FormSchema) -> Self {
        Self {
            identifier: schema.identifier().to_string(),
            columns: schema.columns().to_vec(),
            rows: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn push(&mut self, id: RowId, row: Row) {
        self.positions.insert(id, self.rows.len());
        self.rows.push(row);
    }

    /// Builds a view from rows handed back by a presentation layer. Cells
    /// outside the declared columns are dropped.
    pub fn from_rows(schema: &FormSchema, rows: Vec<Row>) -> Result<Self, EngineError> {
        let mut view = Self::empty(schema);
        let mut duplicates = Vec::new();
        for row in rows {
            let id = RowId::from_value(row.get(schema.identifier()))
                .ok_or_else(|| EngineError::MissingIdentifier(schema.identifier().to_string()))?;
            if view.positions.contains_key(&id) {
                duplicates.push(id);
                continue;
            }
            let projected = schema
                .column_names()
                .map(|c| (c, row.get(c).clone()))
                .collect();
            view.push(id, projected);
        }
        if !duplicates.is_empty() {
            return Err(EngineError::DuplicateIdentifier {
                table: "edited view".into(),
                ids: duplicates,
            });
        }
        Ok(view)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn class_of(&self, column: &str) -> Option<ColumnClass> {
        self.columns.iter().find(|c| c.name == column).map(|c| c.class)
    }

    /// Rows in display order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn ids(&self) -> impl Iterator<Item = &RowId> {
        self.positions.keys()
    }

    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.positions.get(id).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Edits one cell. Only editable columns of rows already in the view can
    /// be changed.
    pub fn set(&mut self, id: &RowId, column: &str, value: FieldValue) -> Result<(), EngineError> {
        match self.class_of(column) {
            None => return Err(EngineError::UnknownColumn(column.to_string())),
            Some(ColumnClass::Locked) => return Err(EngineError::LockedColumn(column.to_string())),
            Some(ColumnClass::Editable) => {}
        }
        let &i = self
            .positions
            .get(id)
            .ok_or_else(|| EngineError::UnknownRow(id.clone()))?;
        self.rows[i].set(column, value);
        Ok(())
    }

    /// Reorders rows for display. Lookups by identifier are unaffected.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Row, &Row) -> std::cmp::Ordering,
    {
        self.rows.sort_by(|a, b| compare(a, b));
        self.positions = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| RowId::from_value(row.get(&self.identifier)).map(|id| (id, i)))
            .collect();
    }
}

/// Overlays corrections onto the (already partition-filtered) base.
///
/// Editable columns take the overlay value when it is non-blank, otherwise
/// the base value. Locked columns always come from the base, so a stale
/// overlay entry cannot bring back a since-corrected locked field. Overlay
/// rows whose identifier is not in the base are ignored.
pub fn merge(base: &Table, overlay: &Table, schema: &FormSchema) -> MergedView {
    let (base_index, _) = index_first_wins(base);
    let (overlay_index, _) = index_first_wins(overlay);

    let mut view = MergedView::empty(schema);
    let mut overridden = 0usize;

    for (i, base_row) in base.rows().iter().enumerate() {
        let Some(id) = base.row_id(base_row) else {
            continue;
        };
        // Later duplicates of an identifier lose to the first occurrence.
        if base_index.position(&id) != Some(i) {
            continue;
        }
        let overlay_row = overlay_index.get(&id);

        let mut row = Row::new();
        for spec in schema.columns() {
            let base_value = base_row.get(&spec.name);
            let value = match (spec.class, overlay_row) {
                (ColumnClass::Editable, Some(o)) if !o.get(&spec.name).is_blank() => {
                    overridden += 1;
                    o.get(&spec.name)
                }
                _ => base_value,
            };
            row.set(&spec.name, value.clone());
        }
        view.push(id, row);
    }

    let orphaned = overlay
        .rows()
        .iter()
        .filter_map(|r| overlay.row_id(r))
        .filter(|id| !base_index.contains(id))
        .count();
    debug!(
        rows = view.len(),
        overridden_cells = overridden,
        orphaned_overlay_rows = orphaned,
        "merged overlay onto base"
    );
    view
}
