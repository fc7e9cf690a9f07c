use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{error, info};

use rosterdesk_core::{Clock, ColumnClass, EditorId, FieldValue, FormSchema, RawTable, Row, RowId};
use rosterdesk_storage::TableSource;

use crate::error::{EngineError, Violation};
use crate::row_store::{self, index_first_wins};

/// Checks every changed row for blank required columns. All violations are
/// collected so the user can fix them in one pass.
pub fn validate(
    rows: &[Row],
    required: &BTreeSet<String>,
    schema: &FormSchema,
) -> Result<Vec<RowId>, EngineError> {
    let mut ids = Vec::with_capacity(rows.len());
    let mut seen = HashSet::with_capacity(rows.len());
    let mut duplicates = Vec::new();
    let mut violations = Vec::new();

    for row in rows {
        let id = RowId::from_value(row.get(schema.identifier()))
            .ok_or_else(|| EngineError::MissingIdentifier(schema.identifier().to_string()))?;
        for column in required {
            if row.get(column).is_blank() {
                violations.push(Violation {
                    row: id.clone(),
                    column: column.clone(),
                });
            }
        }
        if !seen.insert(id.clone()) {
            duplicates.push(id.clone());
        }
        ids.push(id);
    }

    if !duplicates.is_empty() {
        return Err(EngineError::DuplicateIdentifier {
            table: "changed rows".into(),
            ids: duplicates,
        });
    }
    if !violations.is_empty() {
        return Err(EngineError::Validation(violations));
    }
    Ok(ids)
}

/// Writes validated, stamped rows into the overlay table.
///
/// The overlay is read from the source immediately before merging, never
/// from a copy held since the session opened, so rows saved by other
/// sessions in the meantime survive. A row with the same identifier is
/// replaced in place (first occurrence if the overlay holds duplicates); new
/// identifiers are appended.
///
/// Persistence is a full-table replace. On a source without transactions a
/// failed write can leave the overlay partially written; the error says so
/// and the caller is expected to retry by hand.
pub struct SaveCoordinator<'a, S: TableSource> {
    source: &'a mut S,
    schema: &'a FormSchema,
    overlay_table: &'a str,
}

impl<'a, S: TableSource> SaveCoordinator<'a, S> {
    pub fn new(source: &'a mut S, schema: &'a FormSchema, overlay_table: &'a str) -> Self {
        Self {
            source,
            schema,
            overlay_table,
        }
    }

    /// The overlay row written for one changed row: identifier, editable
    /// columns and audit stamps. Locked columns are never written.
    fn overlay_entry(&self, row: &Row, editor: &EditorId, now_ms: i64) -> Row {
        let audit = self.schema.audit();
        let mut entry = Row::new();
        entry.set(self.schema.identifier(), row.get(self.schema.identifier()).clone());
        for column in self.schema.editable() {
            entry.set(column, row.get(column).clone());
        }
        entry.set(&audit.edited_by, FieldValue::Text(editor.as_str().to_string()));
        entry.set(&audit.edited_at, FieldValue::Timestamp(now_ms));
        entry
    }

    /// Existing header plus the columns this save owns. A locked column is
    /// kept only while some untouched row still carries it.
    fn header(&self, existing: &[String], rows: &[Row]) -> Vec<String> {
        let audit = self.schema.audit();
        let mut columns: Vec<String> = existing
            .iter()
            .filter(|c| {
                let stale_locked = c.as_str() != self.schema.identifier()
                    && self.schema.class_of(c) == Some(ColumnClass::Locked);
                !stale_locked || rows.iter().any(|r| r.contains(c))
            })
            .cloned()
            .collect();
        let owned = std::iter::once(self.schema.identifier())
            .chain(self.schema.editable())
            .chain([audit.edited_by.as_str(), audit.edited_at.as_str()]);
        for column in owned {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }

    /// Validates, stamps and persists `changed_rows`. Returns the number of
    /// overlay rows written. Nothing is read or written when there is nothing
    /// to save, and nothing is written when validation fails.
    pub fn save(
        &mut self,
        changed_rows: &[Row],
        required: &BTreeSet<String>,
        editor: &EditorId,
        clock: &dyn Clock,
    ) -> Result<usize, EngineError> {
        if changed_rows.is_empty() {
            return Ok(0);
        }
        let ids = validate(changed_rows, required, self.schema)?;
        let now_ms = clock.now_ms()?;

        let raw = self.source.read_table(self.overlay_table)?;
        let overlay = row_store::load(raw, self.schema.identifier())?;
        let (index, _) = index_first_wins(&overlay);
        let mut positions: HashMap<RowId, usize> = index.into_positions();
        let mut rows = overlay.rows().to_vec();

        let locked: Vec<&str> = self
            .schema
            .locked()
            .filter(|c| *c != self.schema.identifier())
            .collect();

        let mut replaced = 0usize;
        for (id, row) in ids.into_iter().zip(changed_rows) {
            let entry = self.overlay_entry(row, editor, now_ms);
            match positions.get(&id) {
                Some(&i) => {
                    let existing = &mut rows[i];
                    for column in &locked {
                        existing.remove(column);
                    }
                    for (column, value) in entry.iter() {
                        if column != self.schema.identifier() {
                            existing.set(column, value.clone());
                        }
                    }
                    replaced += 1;
                }
                None => {
                    positions.insert(id, rows.len());
                    rows.push(entry);
                }
            }
        }

        let written = changed_rows.len();
        let table = RawTable::new(self.overlay_table, self.header(overlay.columns(), &rows), rows);
        if let Err(e) = self.source.replace_table(self.overlay_table, &table) {
            error!(table = self.overlay_table, error = %e, "overlay write failed");
            return Err(EngineError::Persistence {
                table: self.overlay_table.to_string(),
                source: e,
            });
        }

        info!(
            table = self.overlay_table,
            editor = %editor,
            written,
            replaced,
            appended = written - replaced,
            "saved overlay rows"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rosterdesk_core::{AuditColumns, ColumnSpec, FixedClock};
    use rosterdesk_storage::MemoryTableStore;

    const OVERLAY: &str = "EDICIONES";

    fn schema() -> FormSchema {
        FormSchema::new(
            "id",
            "saf",
            vec![
                ColumnSpec::locked("id"),
                ColumnSpec::locked("saf"),
                ColumnSpec::locked("apellido_nombre"),
                ColumnSpec::editable("status"),
                ColumnSpec::editable("organismo_destino"),
            ],
            BTreeSet::from(["status".to_string()]),
            AuditColumns::default(),
        )
        .unwrap()
    }

    fn editor() -> EditorId {
        EditorId::new("jdiaz").unwrap()
    }

    #[test]
    fn validation_names_every_violation() {
        let rows = vec![
            Row::new().with("id", "S1").with("status", "Activo"),
            Row::new().with("id", "S2").with("organismo_destino", "MEF"),
            Row::new().with("id", "S5").with("status", "  "),
        ];
        let err = validate(&rows, schema().required(), &schema()).unwrap_err();
        let names: Vec<String> = err.violations().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["S2/status", "S5/status"]);
    }

    #[test]
    fn rejected_save_writes_nothing() {
        let mut store = MemoryTableStore::new();
        let clock = FixedClock::new(1_000);
        let schema = schema();
        let rows = vec![Row::new().with("id", "S2").with("organismo_destino", "MEF")];
        let result = SaveCoordinator::new(&mut store, &schema, OVERLAY).save(
            &rows,
            schema.required(),
            &editor(),
            &clock,
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert!(!store.contains(OVERLAY));
    }

    #[test]
    fn empty_save_is_a_no_op() {
        let mut store = MemoryTableStore::new();
        let schema = schema();
        let written = SaveCoordinator::new(&mut store, &schema, OVERLAY)
            .save(&[], schema.required(), &editor(), &FixedClock::new(0))
            .unwrap();
        assert_eq!(written, 0);
        assert!(!store.contains(OVERLAY));
    }

    #[test]
    fn stamps_and_strips_locked_columns() {
        let mut store = MemoryTableStore::new();
        let schema = schema();
        let rows = vec![Row::new()
            .with("id", "S1")
            .with("saf", "SAF-10")
            .with("apellido_nombre", "Juana Diaz")
            .with("status", "Activo")];
        let written = SaveCoordinator::new(&mut store, &schema, OVERLAY)
            .save(&rows, schema.required(), &editor(), &FixedClock::new(1_700_000_000_000))
            .unwrap();
        assert_eq!(written, 1);

        let overlay = store.read_table(OVERLAY).unwrap();
        assert_eq!(overlay.rows.len(), 1);
        let row = &overlay.rows[0];
        assert_eq!(row.get("status"), &FieldValue::text("Activo"));
        assert_eq!(row.get("edited_by"), &FieldValue::text("jdiaz"));
        assert_eq!(row.get("edited_at"), &FieldValue::Timestamp(1_700_000_000_000));
        assert!(!row.contains("apellido_nombre"));
        assert!(!row.contains("saf"));
        assert_eq!(
            overlay.columns,
            vec!["id", "status", "organismo_destino", "edited_by", "edited_at"]
        );
    }

    #[test]
    fn replaces_in_place_and_keeps_others() {
        let schema = schema();
        let existing = RawTable::new(
            OVERLAY,
            vec!["id".into(), "status".into(), "notas".into(), "saf".into()],
            vec![
                Row::new().with("id", "S3").with("status", "Licencia").with("notas", "x").with("saf", "SAF-10"),
                Row::new().with("id", "S4").with("status", "Baja"),
            ],
        );
        let mut store = MemoryTableStore::new().with_table(existing);
        let rows = vec![
            Row::new().with("id", "s3").with("status", "Activo"),
            Row::new().with("id", "S7").with("status", "Activo"),
        ];
        SaveCoordinator::new(&mut store, &schema, OVERLAY)
            .save(&rows, schema.required(), &editor(), &FixedClock::new(5))
            .unwrap();

        let overlay = store.read_table(OVERLAY).unwrap();
        assert_eq!(overlay.rows.len(), 3);
        let s3 = &overlay.rows[0];
        assert_eq!(s3.get("status"), &FieldValue::text("Activo"));
        assert_eq!(s3.get("id"), &FieldValue::text("S3"));
        assert_eq!(s3.get("notas"), &FieldValue::text("x"));
        assert!(!s3.contains("saf"));
        assert_eq!(overlay.rows[1].get("status"), &FieldValue::text("Baja"));
        assert_eq!(overlay.rows[2].get("id"), &FieldValue::text("S7"));
        assert!(overlay.columns.iter().any(|c| c == "notas"));
        assert!(!overlay.columns.iter().any(|c| c == "saf"));
    }

    #[test]
    fn locked_header_column_kept_while_a_row_carries_it() {
        let schema = schema();
        let existing = RawTable::new(
            OVERLAY,
            vec!["id".into(), "saf".into(), "status".into()],
            vec![
                Row::new().with("id", "S3").with("saf", "SAF-10").with("status", "Licencia"),
                Row::new().with("id", "S4").with("saf", "SAF-20").with("status", "Baja"),
            ],
        );
        let mut store = MemoryTableStore::new().with_table(existing);
        let rows = vec![Row::new().with("id", "S3").with("status", "Activo")];
        SaveCoordinator::new(&mut store, &schema, OVERLAY)
            .save(&rows, schema.required(), &editor(), &FixedClock::new(5))
            .unwrap();

        let overlay = store.read_table(OVERLAY).unwrap();
        assert!(!overlay.rows[0].contains("saf"));
        assert_eq!(overlay.rows[1].get("saf"), &FieldValue::text("SAF-20"));
        assert!(overlay.columns.iter().any(|c| c == "saf"));
    }

    #[test]
    fn overlay_without_identifier_is_schema_error() {
        let schema = schema();
        let broken = RawTable::new(OVERLAY, vec!["legajo".into()], vec![Row::new().with("legajo", "1")]);
        let mut store = MemoryTableStore::new().with_table(broken);
        let rows = vec![Row::new().with("id", "S1").with("status", "Activo")];
        let result = SaveCoordinator::new(&mut store, &schema, OVERLAY).save(
            &rows,
            schema.required(),
            &editor(),
            &FixedClock::new(0),
        );
        assert!(matches!(result, Err(EngineError::Schema(_))));
    }

    #[test]
    fn duplicate_changed_rows_rejected() {
        let rows = vec![
            Row::new().with("id", "S1").with("status", "Activo"),
            Row::new().with("id", "S1").with("status", "Baja"),
        ];
        assert!(matches!(
            validate(&rows, schema().required(), &schema()),
            Err(EngineError::DuplicateIdentifier { .. })
        ));
    }
}
