//! Sync gateway between one client and the document store.
//!
//! # Responsibility
//! - Debounce outbound pushes so bursts of edits produce one write.
//! - Queue inbound change notifications and hand the newest one to the client.
//! - Turn persistence failures and malformed payloads into notices.
//!
//! # Invariants
//! - At most one push is pending; a newer schedule supersedes it.
//! - Failed pushes are not retried and never roll back local state.
//! - Inbound payloads replace local state wholesale; there is no merge.
//! - A payload equal to this gateway's last successful push is an echo and
//!   is dropped.

use crate::model::document::MindMapDocument;
use crate::model::snapshot::TreeSnapshot;
use crate::sync::store::{DocumentStore, SnapshotListener, StoreResult, Subscription};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Sync tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Coalescing window for outbound pushes. Zero pushes on the next poll.
    pub debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Non-blocking notification for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    /// A push failed; the edit was not saved.
    PushFailed { document_id: String, message: String },
    /// A remote payload was rejected; local state was kept.
    RemoteRejected { document_id: String, message: String },
    /// The initial load failed.
    LoadFailed { document_id: String, message: String },
}

/// Result of one attempted push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Saved,
    Failed(String),
}

/// Validated inbound document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSnapshot {
    pub snapshot: TreeSnapshot,
    pub action_items: Option<Vec<String>>,
}

struct PendingPush {
    body: Value,
    due_at: Instant,
}

/// Debounced push / subscribed pull for one document.
pub struct SyncGateway {
    store: Arc<dyn DocumentStore>,
    document_id: String,
    debounce: Duration,
    pending: Option<PendingPush>,
    last_pushed: Option<Value>,
    inbox: Arc<Mutex<VecDeque<Value>>>,
    subscription: Option<Subscription>,
    notices: Vec<SyncNotice>,
}

impl SyncGateway {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        document_id: impl Into<String>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            document_id: document_id.into(),
            debounce: config.debounce(),
            pending: None,
            last_pushed: None,
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            subscription: None,
            notices: Vec::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Subscribes to remote changes. Idempotent.
    pub fn connect(&mut self) -> StoreResult<()> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let inbox = Arc::clone(&self.inbox);
        let listener: SnapshotListener = Arc::new(move |body: &Value| {
            inbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(body.clone());
        });
        match self.store.subscribe(&self.document_id, listener) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                info!(
                    "event=sync_connect module=sync status=ok document_id={}",
                    self.document_id
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=sync_connect module=sync status=error document_id={} error={}",
                    self.document_id, err
                );
                Err(err)
            }
        }
    }

    /// Drops the subscription and any undelivered inbound payloads.
    pub fn disconnect(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!(
                "event=sync_disconnect module=sync status=ok document_id={}",
                self.document_id
            );
        }
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    /// Loads the currently stored document, if any.
    ///
    /// Failures and invalid payloads are reported as notices and yield `None`.
    pub fn load(&mut self) -> Option<RemoteSnapshot> {
        match self.store.load(&self.document_id) {
            Ok(Some(body)) => self.accept_remote(body),
            Ok(None) => None,
            Err(err) => {
                warn!(
                    "event=sync_load module=sync status=error document_id={} error={}",
                    self.document_id, err
                );
                self.notices.push(SyncNotice::LoadFailed {
                    document_id: self.document_id.clone(),
                    message: err.to_string(),
                });
                None
            }
        }
    }

    /// Queues `document` for a push at `now + debounce`, superseding any
    /// pending push.
    pub fn schedule_push(&mut self, document: &MindMapDocument, now: Instant) {
        let body = match document.to_value() {
            Ok(body) => body,
            Err(err) => {
                error!(
                    "event=sync_push module=sync status=error document_id={} error_code=encode_failed error={}",
                    self.document_id, err
                );
                self.notices.push(SyncNotice::PushFailed {
                    document_id: self.document_id.clone(),
                    message: err.to_string(),
                });
                return;
            }
        };
        let superseded = self.pending.is_some();
        self.pending = Some(PendingPush {
            body,
            due_at: now + self.debounce,
        });
        debug!(
            "event=sync_schedule module=sync status=ok document_id={} superseded={}",
            self.document_id, superseded
        );
    }

    pub fn has_pending_push(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_push_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due_at)
    }

    /// Pushes the pending document once its debounce window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<PushOutcome> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.due_at <= now);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Pushes the pending document immediately.
    pub fn flush(&mut self) -> Option<PushOutcome> {
        let pending = self.pending.take()?;
        Some(self.push(pending.body))
    }

    /// Drops the pending push without sending it.
    pub fn discard_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Returns the newest inbound snapshot, discarding older queued ones.
    pub fn drain_remote(&mut self) -> Option<RemoteSnapshot> {
        let (latest, skipped) = {
            let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
            let latest = inbox.pop_back();
            let skipped = inbox.len();
            inbox.clear();
            (latest?, skipped)
        };
        if skipped > 0 {
            debug!(
                "event=sync_receive module=sync status=ok document_id={} coalesced={}",
                self.document_id, skipped
            );
        }
        if self.last_pushed.as_ref() == Some(&latest) {
            debug!(
                "event=sync_receive module=sync status=skip document_id={} reason=echo",
                self.document_id
            );
            return None;
        }
        self.accept_remote(latest)
    }

    pub fn take_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    fn push(&mut self, body: Value) -> PushOutcome {
        match self.store.save(&self.document_id, &body) {
            Ok(()) => {
                info!(
                    "event=sync_push module=sync status=ok document_id={}",
                    self.document_id
                );
                self.last_pushed = Some(body);
                PushOutcome::Saved
            }
            Err(err) => {
                warn!(
                    "event=sync_push module=sync status=error document_id={} error={}",
                    self.document_id, err
                );
                let message = err.to_string();
                self.notices.push(SyncNotice::PushFailed {
                    document_id: self.document_id.clone(),
                    message: message.clone(),
                });
                PushOutcome::Failed(message)
            }
        }
    }

    fn accept_remote(&mut self, body: Value) -> Option<RemoteSnapshot> {
        let parsed = MindMapDocument::from_value(&body).and_then(MindMapDocument::into_snapshot);
        match parsed {
            Ok((snapshot, action_items)) => {
                info!(
                    "event=sync_receive module=sync status=ok document_id={} nodes={} edges={}",
                    self.document_id,
                    snapshot.nodes.len(),
                    snapshot.edges.len()
                );
                Some(RemoteSnapshot {
                    snapshot,
                    action_items,
                })
            }
            Err(err) => {
                warn!(
                    "event=sync_receive module=sync status=error document_id={} error_code=remote_rejected error={}",
                    self.document_id, err
                );
                self.notices.push(SyncNotice::RemoteRejected {
                    document_id: self.document_id.clone(),
                    message: err.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PushOutcome, SyncConfig, SyncGateway, SyncNotice};
    use crate::model::document::MindMapDocument;
    use crate::model::node::Node;
    use crate::model::snapshot::TreeSnapshot;
    use crate::sync::memory_store::InMemoryDocumentStore;
    use crate::sync::store::DocumentStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn document(label: &str) -> MindMapDocument {
        MindMapDocument::from_snapshot(&TreeSnapshot::with_root(Node::with_id("1", label)), None)
    }

    #[test]
    fn schedule_push_debounces_and_supersedes() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut gateway = SyncGateway::new(store.clone(), "s1", &SyncConfig { debounce_ms: 1000 });
        let start = Instant::now();

        gateway.schedule_push(&document("first"), start);
        gateway.schedule_push(&document("second"), start + Duration::from_millis(600));

        assert_eq!(gateway.poll(start + Duration::from_millis(1000)), None);
        assert!(store.load("s1").expect("load").is_none());

        assert_eq!(
            gateway.poll(start + Duration::from_millis(1600)),
            Some(PushOutcome::Saved)
        );
        let stored = store.load("s1").expect("load").expect("document stored");
        assert_eq!(stored["nodes"][0]["data"]["label"], json!("second"));
        assert!(!gateway.has_pending_push());
    }

    #[test]
    fn own_push_is_not_replayed_as_remote_change() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut gateway = SyncGateway::new(store, "s1", &SyncConfig { debounce_ms: 0 });
        gateway.connect().expect("connect should succeed");

        gateway.schedule_push(&document("mine"), Instant::now());
        assert_eq!(gateway.flush(), Some(PushOutcome::Saved));
        assert!(gateway.drain_remote().is_none());
    }

    #[test]
    fn malformed_remote_payload_becomes_notice() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut gateway = SyncGateway::new(store.clone(), "s1", &SyncConfig::default());
        gateway.connect().expect("connect should succeed");

        store
            .save("s1", &json!({ "nodes": [] }))
            .expect("store accepts any JSON body");
        assert!(gateway.drain_remote().is_none());
        assert!(matches!(
            gateway.take_notices().as_slice(),
            [SyncNotice::RemoteRejected { .. }]
        ));
    }

    #[test]
    fn failed_push_is_reported_and_not_retried() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.freeze("s1").expect("freeze should succeed");
        let mut gateway = SyncGateway::new(store, "s1", &SyncConfig { debounce_ms: 0 });

        let now = Instant::now();
        gateway.schedule_push(&document("late edit"), now);
        assert!(matches!(gateway.poll(now), Some(PushOutcome::Failed(_))));
        assert!(!gateway.has_pending_push());
        assert_eq!(gateway.poll(now), None);
        assert!(matches!(
            gateway.take_notices().as_slice(),
            [SyncNotice::PushFailed { .. }]
        ));
    }
}
