use neatly_core::db::migrations::latest_version;
use neatly_core::db::{open_db, open_db_in_memory, DbError};
use neatly_core::{
    NoteMutationCoordinator, RemoteStore, Session, SqliteRemoteStore, StoreError, Tag, TagId,
};
use rusqlite::{params, Connection};
use std::sync::Arc;

fn session() -> Session {
    Session::from_token("local")
}

fn local_coordinator() -> (Arc<SqliteRemoteStore>, NoteMutationCoordinator) {
    let store = Arc::new(SqliteRemoteStore::in_memory().unwrap());
    let coordinator = NoteMutationCoordinator::new(store.clone(), session());
    (store, coordinator)
}

fn sorted_tag_ids(tags: &[Tag]) -> Vec<TagId> {
    let mut ids: Vec<TagId> = tags.iter().map(|tag| tag.id).collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn create_flow_persists_note_with_new_and_existing_tags() {
    let (store, coordinator) = local_coordinator();
    let seed = coordinator
        .create_note("seed", "body", vec![Tag::ephemeral("work")])
        .settle()
        .await;
    let work_id = seed.created_tag_ids()[0];

    let report = coordinator
        .create_note(
            "second",
            "text",
            vec![Tag::existing(work_id, "work"), Tag::ephemeral("home")],
        )
        .settle()
        .await;
    assert!(report.is_clean());
    let note_id = report.created_note_id().unwrap();

    let note = store.get_note(&session(), note_id).await.unwrap();
    let labels: Vec<&str> = note.tags.iter().map(|tag| tag.label.as_str()).collect();
    assert_eq!(labels, vec!["home", "work"]);
    assert!(note.tags.iter().all(|tag| !tag.is_ephemeral()));
    assert_eq!(note.short_body, "text");

    let all_tags = coordinator.list_tags().await.unwrap();
    assert_eq!(all_tags.len(), 2);
}

#[tokio::test]
async fn update_flow_converges_remote_tags_to_desired_set() {
    let (store, coordinator) = local_coordinator();
    let created = coordinator
        .create_note("n", "b", vec![Tag::ephemeral("a"), Tag::ephemeral("b")])
        .settle()
        .await;
    let note_id = created.created_note_id().unwrap();
    let previous = store.get_note(&session(), note_id).await.unwrap().tags;
    let tag_b = previous.iter().find(|tag| tag.label == "b").unwrap().clone();

    let desired = vec![tag_b.clone(), Tag::ephemeral("c")];
    let report = coordinator
        .update_note(note_id, &previous, "n2", "b2", &desired)
        .settle()
        .await;
    assert!(report.is_clean());

    let note = store.get_note(&session(), note_id).await.unwrap();
    assert_eq!(note.header, "n2");
    assert_eq!(note.body, "b2");
    let labels: Vec<&str> = note.tags.iter().map(|tag| tag.label.as_str()).collect();
    assert_eq!(labels, vec!["b", "c"]);
    assert!(note.tags.iter().any(|tag| tag.id == tag_b.id));
}

#[tokio::test]
async fn update_with_identical_tags_leaves_associations_untouched() {
    let (store, coordinator) = local_coordinator();
    let created = coordinator
        .create_note("n", "b", vec![Tag::ephemeral("keep")])
        .settle()
        .await;
    let note_id = created.created_note_id().unwrap();
    let tags = store.get_note(&session(), note_id).await.unwrap().tags;

    let report = coordinator
        .update_note(note_id, &tags, "n", "changed", &tags)
        .settle()
        .await;

    assert_eq!(report.outcomes.len(), 1);
    let note = store.get_note(&session(), note_id).await.unwrap();
    assert_eq!(sorted_tag_ids(&note.tags), sorted_tag_ids(&tags));
}

#[tokio::test]
async fn delete_flow_removes_note_and_associations() {
    let (store, coordinator) = local_coordinator();
    let created = coordinator
        .create_note("n", "b", vec![Tag::ephemeral("x"), Tag::ephemeral("y")])
        .settle()
        .await;
    let note_id = created.created_note_id().unwrap();
    let tags = store.get_note(&session(), note_id).await.unwrap().tags;

    let report = coordinator.delete_note(note_id, &tags).settle().await;
    assert!(report.is_clean());

    let err = store.get_note(&session(), note_id).await.unwrap_err();
    assert!(err.is_not_found());
    // Tags outlive the note; only associations go away.
    assert_eq!(coordinator.list_tags().await.unwrap().len(), 2);
    let filtered = coordinator.list_notes(&["x".to_string()]).await.unwrap();
    assert!(filtered.is_empty());
}

#[tokio::test]
async fn rename_keeps_tag_identity() {
    let (store, coordinator) = local_coordinator();
    let created = coordinator
        .create_note("n", "b", vec![Tag::ephemeral("old")])
        .settle()
        .await;
    let tag_id = created.created_tag_ids()[0];
    let note_id = created.created_note_id().unwrap();

    let report = coordinator.rename_tag(tag_id, "new").settle().await;
    assert!(report.is_clean());

    let note = store.get_note(&session(), note_id).await.unwrap();
    assert_eq!(note.tags.len(), 1);
    assert_eq!(note.tags[0].id, tag_id);
    assert_eq!(note.tags[0].label, "new");
}

#[tokio::test]
async fn list_notes_requires_every_filter_term() {
    let (_store, coordinator) = local_coordinator();
    coordinator
        .create_note("both", "b", vec![Tag::ephemeral("Work"), Tag::ephemeral("urgent")])
        .settle()
        .await;
    coordinator
        .create_note("one", "b", vec![Tag::ephemeral("homework")])
        .settle()
        .await;
    coordinator.create_note("none", "b", Vec::new()).settle().await;

    let all = coordinator.list_notes(&[]).await.unwrap();
    assert_eq!(all.len(), 3);

    let work = coordinator.list_notes(&["work".to_string()]).await.unwrap();
    assert_eq!(work.len(), 2);

    let both = coordinator
        .list_notes(&["WORK".to_string(), "urg".to_string()])
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].header, "both");
}

#[tokio::test]
async fn list_notes_orders_by_last_edit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("neatly.db");
    let store = SqliteRemoteStore::open(&path).unwrap();
    let first = store.create_note(&session(), "first", "b").await.unwrap();
    let second = store.create_note(&session(), "second", "b").await.unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE notes SET edited = ?2 WHERE id = ?1;",
        params![first, "2024-02-01T00:00:00.000Z"],
    )
    .unwrap();
    conn.execute(
        "UPDATE notes SET edited = ?2 WHERE id = ?1;",
        params![second, "2024-01-01T00:00:00.000Z"],
    )
    .unwrap();
    drop(conn);

    let listed = store.list_notes(&session(), &[]).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|note| note.id.unwrap()).collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn attach_is_idempotent_and_detach_of_absent_association_succeeds() {
    let store = SqliteRemoteStore::in_memory().unwrap();
    let note_id = store.create_note(&session(), "n", "b").await.unwrap();
    let tag_id = store.create_tag(&session(), note_id, "t").await.unwrap();

    store.attach_tag(&session(), note_id, tag_id, "t").await.unwrap();
    store.detach_tag(&session(), note_id, tag_id).await.unwrap();
    store.detach_tag(&session(), note_id, tag_id).await.unwrap();

    let note = store.get_note(&session(), note_id).await.unwrap();
    assert!(note.tags.is_empty());
}

#[tokio::test]
async fn unknown_rows_are_rejected_as_not_found() {
    let store = SqliteRemoteStore::in_memory().unwrap();
    let note_id = store.create_note(&session(), "n", "b").await.unwrap();

    let err = store.update_note(&session(), 999, "h", "b").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(store.delete_note(&session(), 999).await.unwrap_err().is_not_found());
    assert!(store.create_tag(&session(), 999, "t").await.unwrap_err().is_not_found());
    assert!(store
        .attach_tag(&session(), note_id, 999, "missing")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(store.rename_tag(&session(), 999, "x").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn blank_header_and_label_are_bad_requests() {
    let store = SqliteRemoteStore::in_memory().unwrap();
    let err = store.create_note(&session(), "  ", "b").await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let note_id = store.create_note(&session(), "n", "b").await.unwrap();
    let err = store.create_tag(&session(), note_id, "").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn blank_session_token_is_rejected() {
    let store = SqliteRemoteStore::in_memory().unwrap();
    let err = store
        .list_tags(&Session::from_token(" "))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotAuthenticated);
}

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "tags");
    assert_table_exists(&conn, "note_tags");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("neatly.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "note_tags");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be rejected"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
