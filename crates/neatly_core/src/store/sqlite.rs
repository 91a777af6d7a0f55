//! Local SQLite implementation of the remote store contract.
//!
//! # Responsibility
//! - Mirror the REST store's note/tag semantics on a local database so the
//!   coordinator can run offline and under integration tests.
//!
//! # Invariants
//! - `create_tag` inserts the tag and its association in one transaction.
//! - `attach_tag` is idempotent; `detach_tag` of an absent association
//!   succeeds.
//! - Unknown notes or tags are rejected with status 404.
//! - Deleting a note cascades its associations (foreign keys).
//! - Notes are listed by `edited DESC, id ASC`; tags by label.
//! - Queries run on the blocking thread pool; async callers never hold the
//!   connection lock on a runtime worker.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::note::{short_body, Note, NoteId, DEFAULT_NOTE_COLOR};
use crate::model::session::Session;
use crate::model::tag::{Tag, TagId};
use crate::store::{RemoteStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};

const STATUS_INTERNAL: u16 = 500;

const NOTE_SELECT_SQL: &str = "SELECT id, header, body, short_body, color, edited FROM notes";

/// Note/tag store backed by a local SQLite database.
pub struct SqliteRemoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRemoteStore {
    /// Opens a database file, applying pending migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a throwaway in-memory store.
    pub fn in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `work` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, session: &Session, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        if !session.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| internal("local store connection lock poisoned"))?;
            work(&mut guard)
        })
        .await
        .map_err(|err| internal(&format!("local store task failed: {err}")))?
    }
}

#[async_trait]
impl RemoteStore for SqliteRemoteStore {
    async fn create_note(
        &self,
        session: &Session,
        header: &str,
        body: &str,
    ) -> StoreResult<NoteId> {
        if header.trim().is_empty() {
            return Err(StoreError::bad_request("note header is required"));
        }
        let (header, body) = (header.to_string(), body.to_string());
        self.with_conn(session, move |conn| {
            conn.execute(
                "INSERT INTO notes (header, body, short_body, color) VALUES (?1, ?2, ?3, ?4);",
                params![header, body, short_body(&body), DEFAULT_NOTE_COLOR],
            )
            .map_err(db_failure)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn update_note(
        &self,
        session: &Session,
        note_id: NoteId,
        header: &str,
        body: &str,
    ) -> StoreResult<()> {
        let (header, body) = (header.to_string(), body.to_string());
        self.with_conn(session, move |conn| {
            let changed = conn
                .execute(
                    "UPDATE notes
                     SET
                        header = ?2,
                        body = ?3,
                        short_body = ?4,
                        edited = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1;",
                    params![note_id, header, body, short_body(&body)],
                )
                .map_err(db_failure)?;
            if changed == 0 {
                return Err(note_not_found(note_id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_note(&self, session: &Session, note_id: NoteId) -> StoreResult<()> {
        self.with_conn(session, move |conn| {
            let changed = conn
                .execute("DELETE FROM notes WHERE id = ?1;", [note_id])
                .map_err(db_failure)?;
            if changed == 0 {
                return Err(note_not_found(note_id));
            }
            Ok(())
        })
        .await
    }

    async fn create_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        label: &str,
    ) -> StoreResult<TagId> {
        if label.trim().is_empty() {
            return Err(StoreError::bad_request("tag label is required"));
        }
        let label = label.to_string();
        self.with_conn(session, move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_failure)?;
            if !row_exists(&tx, "notes", note_id)? {
                return Err(note_not_found(note_id));
            }
            tx.execute("INSERT INTO tags (label) VALUES (?1);", [&label])
                .map_err(db_failure)?;
            let tag_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO note_tags (note_id, tag_id) VALUES (?1, ?2);",
                params![note_id, tag_id],
            )
            .map_err(db_failure)?;
            touch_note(&tx, note_id)?;
            tx.commit().map_err(db_failure)?;
            Ok(tag_id)
        })
        .await
    }

    async fn attach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
        _label: &str,
    ) -> StoreResult<()> {
        self.with_conn(session, move |conn| {
            if !row_exists(conn, "notes", note_id)? {
                return Err(note_not_found(note_id));
            }
            if !row_exists(conn, "tags", tag_id)? {
                return Err(tag_not_found(tag_id));
            }
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2);",
                    params![note_id, tag_id],
                )
                .map_err(db_failure)?;
            if inserted > 0 {
                touch_note(conn, note_id)?;
            }
            Ok(())
        })
        .await
    }

    async fn detach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
    ) -> StoreResult<()> {
        self.with_conn(session, move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2;",
                    params![note_id, tag_id],
                )
                .map_err(db_failure)?;
            if removed > 0 {
                touch_note(conn, note_id)?;
            }
            Ok(())
        })
        .await
    }

    async fn rename_tag(&self, session: &Session, tag_id: TagId, label: &str) -> StoreResult<()> {
        if label.trim().is_empty() {
            return Err(StoreError::bad_request("tag label is required"));
        }
        let label = label.to_string();
        self.with_conn(session, move |conn| {
            let changed = conn
                .execute(
                    "UPDATE tags SET label = ?2 WHERE id = ?1;",
                    params![tag_id, label],
                )
                .map_err(db_failure)?;
            if changed == 0 {
                return Err(tag_not_found(tag_id));
            }
            Ok(())
        })
        .await
    }

    async fn list_tags(&self, session: &Session) -> StoreResult<Vec<Tag>> {
        self.with_conn(session, |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, label, color
                     FROM tags
                     ORDER BY label COLLATE NOCASE ASC, id ASC;",
                )
                .map_err(db_failure)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Tag {
                        id: row.get("id")?,
                        label: row.get("label")?,
                        color: row.get("color")?,
                    })
                })
                .map_err(db_failure)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_failure)
        })
        .await
    }

    async fn list_notes(&self, session: &Session, tag_filter: &[String]) -> StoreResult<Vec<Note>> {
        let terms = normalize_filter(tag_filter);
        self.with_conn(session, move |conn| {
            let mut stmt = conn
                .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY edited DESC, id ASC;"))
                .map_err(db_failure)?;
            let rows = stmt.query_map([], read_note_row).map_err(db_failure)?;
            let mut notes = Vec::new();
            for row in rows {
                let mut note = row.map_err(db_failure)?;
                note.tags = load_tags_for_note(conn, note_id_of(&note))?;
                if has_every_tag(&note, &terms) {
                    notes.push(note);
                }
            }
            Ok(notes)
        })
        .await
    }

    async fn get_note(&self, session: &Session, note_id: NoteId) -> StoreResult<Note> {
        self.with_conn(session, move |conn| {
            let note = conn
                .query_row(
                    &format!("{NOTE_SELECT_SQL} WHERE id = ?1;"),
                    [note_id],
                    read_note_row,
                )
                .optional()
                .map_err(db_failure)?;
            let mut note = note.ok_or_else(|| note_not_found(note_id))?;
            note.tags = load_tags_for_note(conn, note_id)?;
            Ok(note)
        })
        .await
    }
}

/// Lowercases and trims filter terms, dropping blanks.
fn normalize_filter(tag_filter: &[String]) -> Vec<String> {
    tag_filter
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// A note matches when every term is a substring of one of its tag labels.
fn has_every_tag(note: &Note, terms: &[String]) -> bool {
    terms.iter().all(|term| {
        note.tags
            .iter()
            .any(|tag| tag.label.to_lowercase().contains(term.as_str()))
    })
}

fn read_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: Some(row.get("id")?),
        header: row.get("header")?,
        body: row.get("body")?,
        short_body: row.get("short_body")?,
        tags: Vec::new(),
        color: row.get("color")?,
        edited: row.get("edited")?,
    })
}

fn note_id_of(note: &Note) -> NoteId {
    note.id.unwrap_or_default()
}

fn load_tags_for_note(conn: &Connection, note_id: NoteId) -> StoreResult<Vec<Tag>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.id, t.label, t.color
             FROM note_tags nt
             INNER JOIN tags t ON t.id = nt.tag_id
             WHERE nt.note_id = ?1
             ORDER BY t.label COLLATE NOCASE ASC, t.id ASC;",
        )
        .map_err(db_failure)?;
    let rows = stmt
        .query_map([note_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                label: row.get(1)?,
                color: row.get(2)?,
            })
        })
        .map_err(db_failure)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_failure)
}

fn row_exists(conn: &Connection, table: &'static str, id: i64) -> StoreResult<bool> {
    let exists: i64 = conn
        .query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
            [id],
            |row| row.get(0),
        )
        .map_err(db_failure)?;
    Ok(exists == 1)
}

fn touch_note(conn: &Connection, note_id: NoteId) -> StoreResult<()> {
    conn.execute(
        "UPDATE notes SET edited = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1;",
        [note_id],
    )
    .map_err(db_failure)?;
    Ok(())
}

fn note_not_found(note_id: NoteId) -> StoreError {
    StoreError::not_found(format!("note not found: {note_id}"))
}

fn tag_not_found(tag_id: TagId) -> StoreError {
    StoreError::not_found(format!("tag not found: {tag_id}"))
}

fn internal(message: &str) -> StoreError {
    StoreError::Rejected {
        status: STATUS_INTERNAL,
        message: message.to_string(),
    }
}

fn db_failure(err: rusqlite::Error) -> StoreError {
    internal(&err.to_string())
}
