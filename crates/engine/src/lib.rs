pub mod diff;
pub mod error;
pub mod overlay;
pub mod row_store;
pub mod save;
pub mod session;

pub use diff::{changed_rows, diff};
pub use error::{EngineError, Violation};
pub use overlay::{MergedView, merge};
pub use save::SaveCoordinator;
pub use session::{EditSession, SaveReport, SessionIdentity};

use std::collections::BTreeSet;

use tracing::info;

use rosterdesk_core::{Clock, FormConfig, FormSchema, RowId, SessionId, SystemClock, Table};
use rosterdesk_storage::TableSource;

/// Ties a table source to the form layout: opens edit sessions and saves
/// them back.
pub struct FormEngine<S: TableSource> {
    schema: FormSchema,
    base_table: String,
    overlay_table: String,
    source: S,
    clock: Box<dyn Clock>,
}

impl<S: TableSource> FormEngine<S> {
    pub fn new(config: &FormConfig, source: S) -> Result<Self, EngineError> {
        Self::with_clock(config, source, Box::new(SystemClock))
    }

    pub fn with_clock(config: &FormConfig, source: S, clock: Box<dyn Clock>) -> Result<Self, EngineError> {
        Ok(Self {
            schema: config.schema()?,
            base_table: config.base_table.clone(),
            overlay_table: config.overlay_table.clone(),
            source,
            clock,
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Fresh read of the base table, filtered to one partition.
    pub fn load_base(&self, partition: &str) -> Result<Table, EngineError> {
        let raw = self.source.read_table(&self.base_table)?;
        let base = row_store::load(raw, self.schema.identifier())?;
        Ok(row_store::filter_by_partition(&base, self.schema.partition(), partition)?)
    }

    /// Fresh read of the overlay table.
    pub fn load_overlay(&self) -> Result<Table, EngineError> {
        let raw = self.source.read_table(&self.overlay_table)?;
        Ok(row_store::load(raw, self.schema.identifier())?)
    }

    fn build_view(&self, partition: &str) -> Result<MergedView, EngineError> {
        let base = self.load_base(partition)?;
        let overlay = self.load_overlay()?;
        Ok(merge(&base, &overlay, &self.schema))
    }

    pub fn open_session(&self, identity: SessionIdentity) -> Result<EditSession, EngineError> {
        let id = SessionId::new();
        let displayed = self.build_view(&identity.partition)?;
        info!(
            session = %id,
            editor = %identity.editor,
            partition = identity.partition.as_str(),
            rows = displayed.len(),
            "opened edit session"
        );
        Ok(EditSession::new(id, identity, displayed))
    }

    /// Re-reads base and overlay for the same session, picking up saves made
    /// by others since it opened.
    pub fn refresh(&self, session: &EditSession) -> Result<EditSession, EngineError> {
        let displayed = self.build_view(&session.identity().partition)?;
        Ok(EditSession::new(session.id(), session.identity().clone(), displayed))
    }

    /// Diffs `edited` against the session's displayed snapshot and persists
    /// the changed rows.
    pub fn save(&mut self, session: &EditSession, edited: &MergedView) -> Result<SaveReport, EngineError> {
        let rows = changed_rows(session.displayed(), edited, &self.schema)?;
        let changed: BTreeSet<RowId> = rows
            .iter()
            .filter_map(|r| RowId::from_value(r.get(self.schema.identifier())))
            .collect();

        let persisted = SaveCoordinator::new(&mut self.source, &self.schema, &self.overlay_table).save(
            &rows,
            self.schema.required(),
            &session.identity().editor,
            self.clock.as_ref(),
        )?;

        info!(session = %session.id(), changed = changed.len(), persisted, "save finished");
        Ok(SaveReport { changed, persisted })
    }
}
