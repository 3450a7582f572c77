//! Process-local document store.
//!
//! Shared by an editor and a viewer client living in one process, and by
//! tests standing in for the realtime backend.

use crate::sync::store::{
    normalize_document_id, DocumentStore, ListenerRegistry, SnapshotListener, StoreError,
    StoreResult, Subscription,
};
use log::info;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone)]
struct StoredDocument {
    body: Value,
    frozen: bool,
}

/// In-memory `DocumentStore` with synchronous change fan-out.
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, StoredDocument>>,
    listeners: Arc<ListenerRegistry>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn listener_count(&self, document_id: &str) -> usize {
        self.listeners.listener_count(document_id.trim())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn save(&self, document_id: &str, body: &Value) -> StoreResult<()> {
        let document_id = normalize_document_id(document_id)?;
        {
            let mut documents = self
                .documents
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let frozen = documents
                .get(document_id)
                .is_some_and(|stored| stored.frozen);
            if frozen {
                return Err(StoreError::DocumentFrozen(document_id.to_string()));
            }
            documents.insert(
                document_id.to_string(),
                StoredDocument {
                    body: body.clone(),
                    frozen: false,
                },
            );
        }
        self.listeners.notify(document_id, body);
        Ok(())
    }

    fn load(&self, document_id: &str) -> StoreResult<Option<Value>> {
        let document_id = normalize_document_id(document_id)?;
        Ok(self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_id)
            .filter(|stored| !stored.body.is_null())
            .map(|stored| stored.body.clone()))
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
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(document_id.to_string())
            .or_insert_with(|| StoredDocument {
                body: Value::Null,
                frozen: true,
            })
            .frozen = true;
        info!(
            "event=document_freeze module=sync status=ok document_id={}",
            document_id
        );
        Ok(())
    }

    fn is_frozen(&self, document_id: &str) -> StoreResult<bool> {
        let document_id = normalize_document_id(document_id)?;
        Ok(self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_id)
            .is_some_and(|stored| stored.frozen))
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryDocumentStore;
    use crate::sync::store::{DocumentStore, StoreError};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[test]
    fn save_load_and_notify() {
        let store = InMemoryDocumentStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = store
            .subscribe(
                "s1",
                Arc::new(move |body: &Value| sink.lock().expect("sink lock").push(body.clone())),
            )
            .expect("subscribe should succeed");

        assert!(store.load("s1").expect("load should succeed").is_none());
        store
            .save("s1", &json!({ "nodes": [], "edges": [] }))
            .expect("save should succeed");

        assert_eq!(
            store.load("s1").expect("load should succeed"),
            Some(json!({ "nodes": [], "edges": [] }))
        );
        assert_eq!(seen.lock().expect("sink lock").len(), 1);
    }

    #[test]
    fn frozen_documents_reject_saves() {
        let store = InMemoryDocumentStore::new();
        store.save("s1", &json!({ "nodes": [], "edges": [] })).expect("first save");
        store.freeze("s1").expect("freeze should succeed");
        assert!(store.is_frozen("s1").expect("frozen flag"));

        let err = store
            .save("s1", &json!({ "nodes": [], "edges": [] }))
            .expect_err("frozen document must reject saves");
        assert!(matches!(err, StoreError::DocumentFrozen(id) if id == "s1"));
    }
}
