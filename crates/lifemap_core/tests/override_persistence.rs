use lifemap_core::db::migrations::latest_version;
use lifemap_core::db::{open_db, open_db_in_memory, DbError};
use lifemap_core::model::rows::ItemType;
use lifemap_core::{
    BubbleStore, HydrationSnapshot, ItemRow, LifeAreaRow, OverrideEntry, OverrideRepository,
    OverrideService, Placement, Position, PositionInput, SqliteOverrideRepository,
};
use uuid::Uuid;

fn snapshot() -> (HydrationSnapshot, Uuid) {
    let area = LifeAreaRow {
        id: Uuid::new_v4(),
        name: "Health".to_string(),
        color: None,
        rating: None,
        bubble_position: None,
        bubble_size: None,
    };
    let task = ItemRow {
        id: Uuid::new_v4(),
        life_area_id: Some(area.id),
        workstream_id: None,
        title: "Stretch".to_string(),
        status: "pending".to_string(),
        item_type: ItemType::Task,
        bubble_position: None,
        bubble_size: None,
    };
    let task_id = task.id;
    (
        HydrationSnapshot {
            life_areas: vec![area],
            workstreams: Vec::new(),
            items: vec![task],
        },
        task_id,
    )
}

#[test]
fn migrations_set_user_version_and_create_table() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());

    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'layout_overrides';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn reopening_a_migrated_file_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overrides.sqlite3");
    drop(open_db(&path).unwrap());
    let conn = open_db(&path).unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overrides.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    }

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 99);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("expected schema rejection, got {other:?}"),
    }
}

#[test]
fn manual_drag_survives_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overrides.sqlite3");
    let (snapshot, task_id) = snapshot();

    {
        let conn = open_db(&path).unwrap();
        let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
        let mut store = BubbleStore::new();
        assert_eq!(service.restore(&mut store, "owner-a").unwrap(), 0);
        store.hydrate(&snapshot);
        store.update_position(task_id, PositionInput::Normalized { x: 0.2, y: 0.8 });
        assert_eq!(service.persist(&store, "owner-a").unwrap(), 1);
    }

    let conn = open_db(&path).unwrap();
    let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
    let mut store = BubbleStore::new();
    assert_eq!(service.restore(&mut store, "owner-a").unwrap(), 1);
    store.hydrate(&snapshot);

    let task = store.get(task_id).unwrap();
    assert_eq!(task.placement, Placement::ManualOverride);
    let position = task.position.unwrap();
    assert_eq!(position.x(), 0.2);
    assert_eq!(position.y(), 0.8);
}

#[test]
fn ring_snapped_override_restores_exact_polar_form() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverrideRepository::new(&conn);
    let id = Uuid::new_v4();
    let entry = OverrideEntry {
        position: Position::from_polar(285.0, -2.5),
        manual: false,
    };
    repo.upsert_override("owner-a", id, &entry).unwrap();

    let loaded = repo.load_overrides("owner-a").unwrap();
    assert_eq!(loaded, vec![(id, entry)]);
}

#[test]
fn persist_replaces_previous_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
    let (snapshot, task_id) = snapshot();

    let mut store = BubbleStore::new();
    service.restore(&mut store, "owner-a").unwrap();
    store.hydrate(&snapshot);
    store.update_position(task_id, PositionInput::Polar { ring: 320.0, angle: 1.0 });
    service.persist(&store, "owner-a").unwrap();

    assert!(service.forget(&mut store, "owner-a", task_id).unwrap());
    service.persist(&store, "owner-a").unwrap();

    let repo = SqliteOverrideRepository::new(&conn);
    assert!(repo.load_overrides("owner-a").unwrap().is_empty());
}

#[test]
fn restoring_another_owner_clears_the_store() {
    let conn = open_db_in_memory().unwrap();
    let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
    let (snapshot, _) = snapshot();

    let mut store = BubbleStore::new();
    service.restore(&mut store, "owner-a").unwrap();
    store.hydrate(&snapshot);
    assert_eq!(store.len(), 2);

    service.restore(&mut store, "owner-b").unwrap();
    assert!(store.is_empty());
    assert_eq!(store.owner(), Some("owner-b"));
}

#[test]
fn record_writes_only_the_moved_bubble() {
    let conn = open_db_in_memory().unwrap();
    let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
    let (snapshot, task_id) = snapshot();
    let area_id = snapshot.life_areas[0].id;

    let mut store = BubbleStore::new();
    service.restore(&mut store, "owner-a").unwrap();
    store.hydrate(&snapshot);
    assert!(!service.record(&store, "owner-a", task_id).unwrap());

    store.update_position(task_id, PositionInput::Normalized { x: 0.2, y: 0.8 });
    assert!(service.record(&store, "owner-a", task_id).unwrap());

    let repo = SqliteOverrideRepository::new(&conn);
    let loaded = repo.load_overrides("owner-a").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].0, task_id);
    assert!(loaded[0].1.manual);
    assert!(loaded.iter().all(|(id, _)| *id != area_id));
}

#[test]
fn clear_wipes_the_owner_cache_everywhere() {
    let conn = open_db_in_memory().unwrap();
    let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
    let (snapshot, task_id) = snapshot();

    let mut store = BubbleStore::new();
    service.restore(&mut store, "owner-a").unwrap();
    store.hydrate(&snapshot);
    store.update_position(task_id, PositionInput::Polar { ring: 320.0, angle: 1.0 });
    service.persist(&store, "owner-a").unwrap();

    let other = SqliteOverrideRepository::new(&conn);
    other
        .upsert_override(
            "owner-b",
            task_id,
            &OverrideEntry {
                position: Position::from_polar(320.0, -1.0),
                manual: false,
            },
        )
        .unwrap();

    assert_eq!(service.clear(&mut store, "owner-a").unwrap(), 1);
    assert!(store.overrides().is_empty());
    assert!(other.load_overrides("owner-a").unwrap().is_empty());
    assert_eq!(other.load_overrides("owner-b").unwrap().len(), 1);
}
