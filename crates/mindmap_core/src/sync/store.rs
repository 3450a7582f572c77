//! Persistence/realtime collaborator contract.
//!
//! # Responsibility
//! - Define the key-value document store consumed by the sync gateway.
//! - Provide the shared listener registry used by store implementations to
//!   fan out change notifications.
//!
//! # Invariants
//! - Documents are keyed by a validated document (session) id.
//! - Every successful `save` notifies all listeners of that document,
//!   including the writer's own subscription.
//! - Frozen documents reject further saves.

use crate::db::DbError;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Callback invoked with the full stored document after each save.
pub type SnapshotListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Errors from document store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Document id is blank or contains unsupported characters.
    InvalidDocumentId(String),
    /// Document was frozen as read-only history.
    DocumentFrozen(String),
    /// Stored body cannot be decoded.
    Serialization(serde_json::Error),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Backend-specific failure reported by a remote store adapter.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDocumentId(id) => write!(f, "document id is invalid: `{id}`"),
            Self::DocumentFrozen(id) => write!(f, "document is frozen: {id}"),
            Self::Serialization(err) => write!(f, "document body is not valid JSON: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "document store requires table `{table}`")
            }
            Self::Backend(message) => write!(f, "document store failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialization(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Key-value document store with push-style change notifications.
pub trait DocumentStore: Send + Sync {
    /// Replaces the stored document and notifies subscribers.
    fn save(&self, document_id: &str, body: &Value) -> StoreResult<()>;
    /// Loads the stored document, if any.
    fn load(&self, document_id: &str) -> StoreResult<Option<Value>>;
    /// Registers a listener for saves of `document_id`.
    fn subscribe(&self, document_id: &str, listener: SnapshotListener)
        -> StoreResult<Subscription>;
    /// Marks the document read-only.
    fn freeze(&self, document_id: &str) -> StoreResult<()>;
    /// Returns whether the document is read-only.
    fn is_frozen(&self, document_id: &str) -> StoreResult<bool>;
}

/// Validates and normalizes a document id.
///
/// Accepted ids are non-blank ASCII alphanumerics plus `-` and `_`.
pub fn normalize_document_id(document_id: &str) -> StoreResult<&str> {
    let trimmed = document_id.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(trimmed)
    } else {
        Err(StoreError::InvalidDocumentId(document_id.to_string()))
    }
}

/// Listener fan-out shared by store implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, (String, SnapshotListener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `listener` and returns a handle that removes it on drop.
    pub fn add(self: &Arc<Self>, document_id: &str, listener: SnapshotListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (document_id.to_string(), listener));
        debug!(
            "event=subscribe module=sync status=ok document_id={} subscription_id={}",
            document_id, id
        );
        Subscription {
            id,
            document_id: document_id.to_string(),
            registry: Arc::downgrade(self),
        }
    }

    /// Invokes every listener of `document_id` with `body`.
    ///
    /// Listeners run outside the registry lock so they may subscribe or
    /// unsubscribe re-entrantly.
    pub fn notify(&self, document_id: &str, body: &Value) {
        let targets: Vec<SnapshotListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(id, _)| id == document_id)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in targets {
            listener(body);
        }
    }

    pub fn listener_count(&self, document_id: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(id, _)| id == document_id)
            .count()
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Live subscription handle; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    document_id: String,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Stops delivery to this subscription's listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
            debug!(
                "event=unsubscribe module=sync status=ok document_id={} subscription_id={}",
                self.document_id, self.id
            );
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("document_id", &self.document_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_document_id, ListenerRegistry, StoreError};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn document_ids_are_trimmed_and_validated() {
        assert_eq!(
            normalize_document_id("  session-1_a ").expect("id should be valid"),
            "session-1_a"
        );
        assert!(matches!(
            normalize_document_id("   "),
            Err(StoreError::InvalidDocumentId(_))
        ));
        assert!(matches!(
            normalize_document_id("a/b"),
            Err(StoreError::InvalidDocumentId(_))
        ));
    }

    #[test]
    fn notify_reaches_only_matching_listeners_until_unsubscribed() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let subscription = registry.add(
            "doc",
            Arc::new(move |_: &Value| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let _other = registry.add("other", Arc::new(|_: &Value| panic!("wrong document")));

        registry.notify("doc", &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count("doc"), 1);

        subscription.unsubscribe();
        registry.notify("doc", &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count("doc"), 0);
    }
}
