use std::path::Path;
use std::sync::Arc;

use rosterdesk_core::{CoreError, FieldValue, FixedClock, FormConfig, RawTable, Row, RowId};
use rosterdesk_engine::{EditSession, EngineError, FormEngine, MergedView, SaveReport, SessionIdentity};
use rosterdesk_storage::{SqliteTableStore, StorageError, TableSource};

pub const BASE_TABLE: &str = "BD_CARGOS_COMPLETA";
pub const OVERLAY_TABLE: &str = "EDICIONES";
pub const START_MS: i64 = 1_767_225_600_000;

pub const ROSTER_CONFIG: &str = r#"
base_table = "BD_CARGOS_COMPLETA"
overlay_table = "EDICIONES"

[schema]
identifier = "id"
partition = "saf"
required = ["status"]

[schema.audit]
edited_by = "editado_por"
edited_at = "fecha_edicion"

[[schema.columns]]
name = "id"
class = "locked"

[[schema.columns]]
name = "saf"
class = "locked"

[[schema.columns]]
name = "apellido_nombre"
class = "locked"

[[schema.columns]]
name = "status"
class = "editable"

[[schema.columns]]
name = "organismo_destino"
class = "editable"

[[schema.columns]]
name = "notas"
class = "editable"
"#;

pub const BASE_COLUMNS: [&str; 5] = ["id", "saf", "apellido_nombre", "status", "organismo_destino"];

pub fn roster_config() -> Result<FormConfig, CoreError> {
    FormConfig::from_toml_str(ROSTER_CONFIG)
}

/// A base roster row.
pub fn person(id: &str, saf: &str, name: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("saf", saf)
        .with("apellido_nombre", name)
}

/// An engine over a single store with a clock the test controls.
pub struct TestDesk<S: TableSource = SqliteTableStore> {
    pub engine: FormEngine<S>,
    pub clock: Arc<FixedClock>,
}

impl TestDesk<SqliteTableStore> {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_source(SqliteTableStore::open_in_memory()?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::with_source(SqliteTableStore::open(path)?)
    }
}

impl<S: TableSource> TestDesk<S> {
    pub fn with_source(source: S) -> Result<Self, EngineError> {
        crate::init_tracing();
        let clock = Arc::new(FixedClock::new(START_MS));
        let engine = FormEngine::with_clock(&roster_config()?, source, Box::new(clock.clone()))?;
        Ok(Self { engine, clock })
    }

    pub fn seed_base(&mut self, rows: Vec<Row>) -> Result<(), StorageError> {
        let columns = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        let table = RawTable::new(BASE_TABLE, columns, rows);
        self.engine.source_mut().replace_table(BASE_TABLE, &table)
    }

    pub fn seed_overlay(&mut self, columns: &[&str], rows: Vec<Row>) -> Result<(), StorageError> {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        let table = RawTable::new(OVERLAY_TABLE, columns, rows);
        self.engine.source_mut().replace_table(OVERLAY_TABLE, &table)
    }

    pub fn session(&self, editor: &str, partition: &str) -> Result<EditSession, EngineError> {
        self.engine.open_session(SessionIdentity::new(editor, partition)?)
    }

    /// Working copy of the session's view with `edits` applied.
    pub fn edit(
        &self,
        session: &EditSession,
        edits: &[(&str, &str, FieldValue)],
    ) -> Result<MergedView, EngineError> {
        let mut view = session.working_copy();
        for (id, column, value) in edits {
            view.set(&RowId::new(*id), column, value.clone())?;
        }
        Ok(view)
    }

    pub fn edit_and_save(
        &mut self,
        session: &EditSession,
        edits: &[(&str, &str, FieldValue)],
    ) -> Result<SaveReport, EngineError> {
        let edited = self.edit(session, edits)?;
        self.engine.save(session, &edited)
    }

    pub fn overlay(&self) -> Result<RawTable, StorageError> {
        self.engine.source().read_table(OVERLAY_TABLE)
    }

    /// Every overlay row stored under `id`, in table order.
    pub fn overlay_rows(&self, id: &str) -> Result<Vec<Row>, StorageError> {
        let key = RowId::new(id);
        Ok(self
            .overlay()?
            .rows
            .into_iter()
            .filter(|r| RowId::from_value(r.get("id")).as_ref() == Some(&key))
            .collect())
    }
}
