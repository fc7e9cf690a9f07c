use std::collections::BTreeSet;

use tracing::debug;

use rosterdesk_core::{FormSchema, Row, RowId};

use crate::error::EngineError;
use crate::overlay::MergedView;

fn check_shape(displayed: &MergedView, edited: &MergedView) -> Result<(), EngineError> {
    let mut missing: Vec<RowId> = displayed.ids().filter(|id| !edited.contains(id)).cloned().collect();
    let mut unexpected: Vec<RowId> = edited.ids().filter(|id| !displayed.contains(id)).cloned().collect();
    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    missing.sort();
    unexpected.sort();
    Err(EngineError::ShapeMismatch { missing, unexpected })
}

fn row_changed(schema: &FormSchema, displayed: &Row, edited: &Row) -> bool {
    schema
        .editable()
        .any(|column| !displayed.get(column).equivalent(edited.get(column)))
}

/// Identifiers whose editable cells differ between the displayed snapshot and
/// the edited one. Locked columns are not compared. Rows are matched by
/// identifier, so the edited view may be in any order, but both views must
/// hold the same identifier set.
pub fn diff(
    displayed: &MergedView,
    edited: &MergedView,
    schema: &FormSchema,
) -> Result<BTreeSet<RowId>, EngineError> {
    check_shape(displayed, edited)?;

    let mut changed = BTreeSet::new();
    for row in displayed.rows() {
        let Some(id) = RowId::from_value(row.get(displayed.identifier())) else {
            continue;
        };
        let Some(edited_row) = edited.get(&id) else {
            continue;
        };
        if row_changed(schema, row, edited_row) {
            changed.insert(id);
        }
    }
    debug!(rows = displayed.len(), changed = changed.len(), "diffed edited view");
    Ok(changed)
}

/// The rows to hand to a save: for each changed identifier, the displayed row
/// with the edited values of its editable columns. Locked cells always come
/// from the displayed snapshot. Returned in displayed order.
pub fn changed_rows(
    displayed: &MergedView,
    edited: &MergedView,
    schema: &FormSchema,
) -> Result<Vec<Row>, EngineError> {
    let changed = diff(displayed, edited, schema)?;
    let mut rows = Vec::with_capacity(changed.len());
    for row in displayed.rows() {
        let Some(id) = RowId::from_value(row.get(displayed.identifier())) else {
            continue;
        };
        if !changed.contains(&id) {
            continue;
        }
        let Some(edited_row) = edited.get(&id) else {
            continue;
        };
        let mut out = row.clone();
        for column in schema.editable() {
            out.set(column, edited_row.get(column).clone());
        }
        rows.push(out);
    }
    Ok(rows)
}
