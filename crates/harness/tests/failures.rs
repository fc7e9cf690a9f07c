use rosterdesk_core::{FieldValue, RawTable, Row, RowId, SchemaError};
use rosterdesk_engine::EngineError;
use rosterdesk_harness::{BASE_TABLE, Failure, FlakyStore, OVERLAY_TABLE, TestDesk, person};
use rosterdesk_storage::{MemoryTableStore, StorageError, TableSource};

fn flaky_desk() -> Result<TestDesk<FlakyStore<MemoryTableStore>>, Box<dyn std::error::Error>> {
    let mut desk = TestDesk::with_source(FlakyStore::new(MemoryTableStore::new()))?;
    desk.seed_base(vec![
        person("S1", "SAF-10", "Juana Diaz"),
        person("S2", "SAF-10", "Pedro Gomez"),
    ])?;
    desk.seed_overlay(
        &["id", "status"],
        vec![
            Row::new().with("id", "S7").with("status", "Baja"),
            Row::new().with("id", "S8").with("status", "Baja"),
        ],
    )?;
    Ok(desk)
}

#[test]
fn failed_write_is_reported_and_retry_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = flaky_desk()?;
    let before = desk.overlay()?;
    let session = desk.session("jdiaz", "SAF-10")?;
    let edited = desk.edit(&session, &[("S1", "status", FieldValue::text("Activo"))])?;

    desk.engine.source_mut().fail_next_replace(Failure::Clean);
    match desk.engine.save(&session, &edited) {
        Err(EngineError::Persistence { table, source }) => {
            assert_eq!(table, OVERLAY_TABLE);
            assert!(matches!(source, StorageError::WriteFailed { .. }));
        }
        other => panic!("expected Persistence, got {other:?}"),
    }
    assert_eq!(desk.overlay()?, before);

    // The user re-submits the same edit
    let report = desk.engine.save(&session, &edited)?;
    assert_eq!(report.persisted, 1);
    assert_eq!(desk.overlay()?.rows.len(), 3);

    Ok(())
}

#[test]
fn partial_write_leaves_overlay_inconsistent() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = flaky_desk()?;
    let session = desk.session("jdiaz", "SAF-10")?;

    desk.engine.source_mut().fail_next_replace(Failure::Partial(1));
    let result = desk.edit_and_save(&session, &[("S1", "status", FieldValue::text("Activo"))]);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("partially written"), "{err}");

    // Only the first row made it: S8 and the new S1 row are gone
    let overlay = desk.overlay()?;
    assert_eq!(overlay.rows.len(), 1);
    assert_eq!(overlay.rows[0].get("id"), &FieldValue::text("S7"));

    Ok(())
}

#[test]
fn base_without_partition_column_is_schema_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::new()?;
    let table = RawTable::new(
        BASE_TABLE,
        vec!["id".into(), "apellido_nombre".into()],
        vec![Row::new().with("id", "S1").with("apellido_nombre", "Juana Diaz")],
    );
    desk.engine.source_mut().replace_table(BASE_TABLE, &table)?;

    match desk.session("jdiaz", "SAF-10") {
        Err(EngineError::Schema(SchemaError::MissingPartitionColumn { table, column })) => {
            assert_eq!(table, BASE_TABLE);
            assert_eq!(column, "saf");
        }
        other => panic!("expected MissingPartitionColumn, got {other:?}"),
    }

    Ok(())
}

#[test]
fn base_without_identifier_column_is_schema_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::new()?;
    let table = RawTable::new(
        BASE_TABLE,
        vec!["legajo".into(), "saf".into()],
        vec![Row::new().with("legajo", "S1").with("saf", "SAF-10")],
    );
    desk.engine.source_mut().replace_table(BASE_TABLE, &table)?;

    assert!(matches!(
        desk.session("jdiaz", "SAF-10"),
        Err(EngineError::Schema(SchemaError::MissingIdentifierColumn { .. }))
    ));

    Ok(())
}

#[test]
fn missing_base_table_is_schema_error() -> Result<(), Box<dyn std::error::Error>> {
    let desk = TestDesk::new()?;
    // A never-written base has no header, so there is no partition column.
    assert!(matches!(
        desk.session("jdiaz", "SAF-10"),
        Err(EngineError::Schema(SchemaError::MissingPartitionColumn { .. }))
    ));
    Ok(())
}

#[test]
fn duplicate_base_ids_are_tolerated() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::new()?;
    desk.seed_base(vec![
        person("S1", "SAF-10", "Juana Diaz"),
        person("S1", "SAF-10", "Juana Diaz (copia)"),
        person("S2", "SAF-10", "Pedro Gomez"),
    ])?;

    let session = desk.session("jdiaz", "SAF-10")?;
    assert_eq!(session.displayed().len(), 2);
    assert_eq!(
        session.displayed().get(&RowId::new("S1")).unwrap().get("apellido_nombre"),
        &FieldValue::text("Juana Diaz")
    );

    desk.edit_and_save(&session, &[("S1", "status", FieldValue::text("Activo"))])?;
    assert_eq!(desk.overlay_rows("S1")?.len(), 1);

    Ok(())
}

#[test]
fn locked_column_edit_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::new()?;
    desk.seed_base(vec![person("S1", "SAF-10", "Juana Diaz")])?;
    let session = desk.session("jdiaz", "SAF-10")?;

    assert!(matches!(
        desk.edit(&session, &[("S1", "apellido_nombre", FieldValue::text("X"))]),
        Err(EngineError::LockedColumn(_))
    ));
    assert!(matches!(
        desk.edit(&session, &[("T9", "status", FieldValue::text("Activo"))]),
        Err(EngineError::UnknownRow(_))
    ));
    assert!(desk.engine.source().read_table(OVERLAY_TABLE)?.is_unwritten());

    Ok(())
}
