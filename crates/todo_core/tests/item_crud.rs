use rusqlite::Connection;
use todo_core::db::migrations::latest_version;
use todo_core::db::open_db_in_memory;
use todo_core::{Item, ItemRepository, RepoError, SqliteItemRepository};
use uuid::Uuid;

fn item(id: u128, description: &str) -> Item {
    Item::new(Uuid::from_u128(id), description, 1_000, 5_000).unwrap()
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let created = item(1, "first item");
    repo.create_item(&created).unwrap();

    let loaded = repo.get_item(created.uuid).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn get_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    assert!(repo.get_item(Uuid::from_u128(9)).unwrap().is_none());
}

#[test]
fn duplicate_create_returns_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    repo.create_item(&item(1, "original")).unwrap();
    let err = repo.create_item(&item(1, "duplicate")).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(id) if id == Uuid::from_u128(1)));

    let stored = repo.get_item(Uuid::from_u128(1)).unwrap().unwrap();
    assert_eq!(stored.description, "original");
}

#[test]
fn save_updates_mutable_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let mut current = item(1, "draft");
    repo.create_item(&current).unwrap();

    current.description = "final".to_string();
    current.done_at = Some(2_000);
    current.due_at = 99;
    current.created_at = 99;
    repo.save_item(&current).unwrap();

    let loaded = repo.get_item(current.uuid).unwrap().unwrap();
    assert_eq!(loaded.description, "final");
    assert_eq!(loaded.done_at, Some(2_000));
    assert_eq!(loaded.due_at, 5_000);
    assert_eq!(loaded.created_at, 1_000);

    current.done_at = None;
    repo.save_item(&current).unwrap();
    assert_eq!(repo.get_item(current.uuid).unwrap().unwrap().done_at, None);
}

#[test]
fn save_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let missing = item(3, "missing");
    let err = repo.save_item(&missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing.uuid));
}

#[test]
fn validation_failure_blocks_create_and_save() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let mut valid = item(1, "valid");
    repo.create_item(&valid).unwrap();

    valid.description = "  ".to_string();
    let err = repo.save_item(&valid).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    let mut nil = item(2, "nil id");
    nil.uuid = Uuid::nil();
    let err = repo.create_item(&nil).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn list_preserves_creation_order_and_filters_done() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    // Ids deliberately out of sort order to prove ordering is by insertion.
    let third = item(3, "c");
    let first = item(1, "a");
    let second = item(2, "b");
    repo.create_item(&third).unwrap();
    repo.create_item(&first).unwrap();
    repo.create_item(&second).unwrap();

    let mut done = first.clone();
    done.done_at = Some(1_500);
    repo.save_item(&done).unwrap();

    let all: Vec<_> = repo
        .list_items(false)
        .unwrap()
        .into_iter()
        .map(|item| item.uuid)
        .collect();
    assert_eq!(all, vec![third.uuid, first.uuid, second.uuid]);

    let open: Vec<_> = repo
        .list_items(true)
        .unwrap()
        .into_iter()
        .map(|item| item.uuid)
        .collect();
    assert_eq!(open, vec![third.uuid, second.uuid]);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteItemRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_items_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("todo_items"))
    ));
}

#[test]
fn repository_rejects_connection_missing_done_at_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE todo_items (
            uuid TEXT PRIMARY KEY NOT NULL,
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            due_at INTEGER NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "todo_items",
            column: "done_at"
        })
    ));
}

#[test]
fn read_rejects_corrupt_uuid() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO todo_items (uuid, description, created_at, due_at)
         VALUES ('not-a-uuid', 'x', 0, 0);",
        [],
    )
    .unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let err = repo.list_items(false).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn update_item_applies_callback_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    repo.create_item(&item(1, "draft")).unwrap();

    let updated = repo
        .update_item::<RepoError, _>(Uuid::from_u128(1), |item| {
            item.description = "final".to_string();
            item.done_at = Some(1_200);
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert_eq!(updated.description, "final");

    let loaded = repo.get_item(Uuid::from_u128(1)).unwrap().unwrap();
    assert_eq!(loaded, updated);
}

#[test]
fn update_item_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let result = repo
        .update_item::<RepoError, _>(Uuid::from_u128(8), |_| {
            panic!("callback must not run for a missing item")
        })
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn update_item_rolls_back_when_callback_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    repo.create_item(&item(1, "keep")).unwrap();

    let err = repo
        .update_item(Uuid::from_u128(1), |item| {
            item.description = "discarded".to_string();
            Err(RepoError::InvalidData("rejected".to_string()))
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));

    let loaded = repo.get_item(Uuid::from_u128(1)).unwrap().unwrap();
    assert_eq!(loaded.description, "keep");

    // The connection must not be left inside an open transaction.
    assert!(conn.is_autocommit());
}

#[test]
fn update_item_rejects_blank_description_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    repo.create_item(&item(1, "keep")).unwrap();

    let err = repo
        .update_item::<RepoError, _>(Uuid::from_u128(1), |item| {
            item.description = " ".to_string();
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(
        repo.get_item(Uuid::from_u128(1)).unwrap().unwrap().description,
        "keep"
    );
}
