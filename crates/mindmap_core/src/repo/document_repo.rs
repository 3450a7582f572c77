//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist mind-map documents keyed by session id.
//! - Keep frozen (ended-session) documents as read-only history.
//! - Fan out change notifications to in-process subscribers.
//!
//! # Invariants
//! - A frozen row is never overwritten; the check and the write are one
//!   statement.
//! - Bodies are stored as JSON text and decoded on load.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory};
use crate::sync::store::{
    normalize_document_id, DocumentStore, ListenerRegistry, SnapshotListener, StoreError,
    StoreResult, Subscription,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const HISTORY_LIMIT_MAX: u32 = 100;

/// Frozen document listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub document_id: String,
    /// Epoch ms of the last write (the freeze for ended sessions).
    pub updated_at: i64,
}

/// `DocumentStore` over one migrated SQLite connection.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
    listeners: Arc<ListenerRegistry>,
}

impl SqliteDocumentStore {
    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_document_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Lists frozen documents, newest first. `limit` is clamped to 1..=100.
    pub fn list_history(&self, limit: u32) -> StoreResult<Vec<HistoryEntry>> {
        let limit = limit.clamp(1, HISTORY_LIMIT_MAX);
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT document_id, updated_at
             FROM documents
             WHERE frozen = 1
             ORDER BY updated_at DESC, document_id ASC
             LIMIT ?1;",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(HistoryEntry {
                document_id: row.get(0)?,
                updated_at: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn save(&self, document_id: &str, body: &Value) -> StoreResult<()> {
        let document_id = normalize_document_id(document_id)?;
        let encoded = serde_json::to_string(body)?;
        let changed = self.conn().execute(
            "INSERT INTO documents (document_id, body)
             VALUES (?1, ?2)
             ON CONFLICT(document_id) DO UPDATE SET
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE documents.frozen = 0;",
            params![document_id, encoded],
        )?;
        if changed == 0 {
            return Err(StoreError::DocumentFrozen(document_id.to_string()));
        }
        self.listeners.notify(document_id, body);
        Ok(())
    }

    fn load(&self, document_id: &str) -> StoreResult<Option<Value>> {
        let document_id = normalize_document_id(document_id)?;
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT body FROM documents WHERE document_id = ?1;",
                [document_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => {
                let body: Value = serde_json::from_str(&raw)?;
                Ok(Some(body).filter(|body| !body.is_null()))
            }
            None => Ok(None),
        }
    }

    fn subscribe(
        &self,
        document_id: &str,
        listener: SnapshotListener,
    ) -> StoreResult<Subscription> {
        let document_id = normalize_document_id(document_id)?;
        Ok(self.listeners.add(document_id, listener))
    }

    fn freeze(&self, document_id: &str) -> StoreResult<()> {
        let document_id = normalize_document_id(document_id)?;
        self.conn().execute(
            "INSERT INTO documents (document_id, body, frozen)
             VALUES (?1, 'null', 1)
             ON CONFLICT(document_id) DO UPDATE SET
                frozen = 1,
                updated_at = (strftime('%s', 'now') * 1000);",
            [document_id],
        )?;
        info!(
            "event=document_freeze module=repo status=ok document_id={}",
            document_id
        );
        Ok(())
    }

    fn is_frozen(&self, document_id: &str) -> StoreResult<bool> {
        let document_id = normalize_document_id(document_id)?;
        let frozen: Option<i64> = self
            .conn()
            .query_row(
                "SELECT frozen FROM documents WHERE document_id = ?1;",
                [document_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(frozen == Some(1))
    }
}

fn ensure_document_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'documents'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::MissingRequiredTable("documents"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteDocumentStore;
    use crate::sync::store::{DocumentStore, StoreError};
    use rusqlite::Connection;
    use serde_json::json;

    #[test]
    fn rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().expect("raw connection");
        assert!(matches!(
            SqliteDocumentStore::try_new(conn),
            Err(StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }

    #[test]
    fn freeze_without_body_loads_as_absent() {
        let store = SqliteDocumentStore::open_in_memory().expect("store should open");
        store.freeze("s1").expect("freeze should succeed");
        assert!(store.is_frozen("s1").expect("frozen flag"));
        assert!(store.load("s1").expect("load should succeed").is_none());
        assert!(matches!(
            store.save("s1", &json!({ "nodes": [], "edges": [] })),
            Err(StoreError::DocumentFrozen(_))
        ));
    }
}
