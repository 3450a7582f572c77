//! Editor and viewer facade over the tree core.
//!
//! # Responsibility
//! - Own one client's snapshot, rename modal, input focus and sync gateway.
//! - Route key presses through navigation into the command processor.
//! - Turn committed document changes into debounced pushes and apply
//!   inbound snapshots from the gateway.
//!
//! # Invariants
//! - Viewers and frozen clients never mutate their snapshot locally.
//! - Selection is local state; inbound snapshots keep it only while the
//!   selected node still exists and is visible.
//! - Action items are carried through untouched.
//! - Inbound snapshots are re-laid out locally; wire positions are ignored.

use crate::command::{Command, CommandProcessor};
use crate::config::CoreConfig;
use crate::model::document::MindMapDocument;
use crate::model::node::{NodeId, NodeKind, Position};
use crate::model::snapshot::TreeSnapshot;
use crate::navigation::{interpret, InputContext, NavAction, NavKey};
use crate::sync::gateway::{PushOutcome, RemoteSnapshot, SyncGateway, SyncNotice};
use crate::sync::store::StoreResult;
use crate::visibility::resolve;
use log::{debug, info};
use std::time::Instant;

/// What a client is allowed to do with its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    Editor,
    /// Read-only mirror that follows remote updates.
    Viewer,
}

impl ClientRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

/// Request for the viewport to center on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusRequest {
    pub node_id: NodeId,
    pub position: Position,
}

/// One visible node ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub position: Position,
    pub expanded: bool,
    pub selected: bool,
    /// Drives the expand/collapse affordance.
    pub has_children: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

/// Visible subset of the current snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderView {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    /// Node whose rename modal is open.
    pub rename_target: Option<NodeId>,
    pub read_only: bool,
}

impl RenderView {
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }
}

/// One participant's view of a shared mind map.
pub struct MindMapClient {
    role: ClientRole,
    snapshot: TreeSnapshot,
    action_items: Option<Vec<String>>,
    processor: CommandProcessor,
    rename_target: Option<NodeId>,
    text_input_focused: bool,
    pending_focus: Option<FocusRequest>,
    gateway: Option<SyncGateway>,
    frozen: bool,
}

impl MindMapClient {
    /// Creates an editor starting from `snapshot`.
    pub fn editor(snapshot: TreeSnapshot, config: &CoreConfig) -> Self {
        let mut client = Self::with_role(ClientRole::Editor, snapshot, config);
        client.processor.relayout(&mut client.snapshot);
        client
    }

    /// Creates an empty viewer; content arrives through `attach`.
    pub fn viewer(config: &CoreConfig) -> Self {
        Self::with_role(ClientRole::Viewer, TreeSnapshot::default(), config)
    }

    fn with_role(role: ClientRole, snapshot: TreeSnapshot, config: &CoreConfig) -> Self {
        Self {
            role,
            snapshot,
            action_items: None,
            processor: CommandProcessor::new(config.layout, &config.editor),
            rename_target: None,
            text_input_focused: false,
            pending_focus: None,
            gateway: None,
            frozen: false,
        }
    }

    pub fn role(&self) -> ClientRole {
        self.role
    }

    pub fn snapshot(&self) -> &TreeSnapshot {
        &self.snapshot
    }

    pub fn action_items(&self) -> Option<&[String]> {
        self.action_items.as_deref()
    }

    pub fn rename_target(&self) -> Option<&str> {
        self.rename_target.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.role == ClientRole::Viewer || self.frozen
    }

    pub fn gateway(&self) -> Option<&SyncGateway> {
        self.gateway.as_ref()
    }

    /// Connects `gateway` and adopts the stored document when one exists.
    ///
    /// An editor whose document is not stored yet schedules its current
    /// snapshot for push.
    pub fn attach(&mut self, mut gateway: SyncGateway, now: Instant) -> StoreResult<()> {
        gateway.connect()?;
        match gateway.load() {
            Some(remote) => self.adopt_remote(remote),
            None if self.role == ClientRole::Editor && !self.snapshot.is_empty() => {
                gateway.schedule_push(&self.to_document(), now);
            }
            None => {}
        }
        info!(
            "event=client_attach module=client status=ok role={} document_id={} nodes={}",
            self.role.as_str(),
            gateway.document_id(),
            self.snapshot.nodes.len()
        );
        self.gateway = Some(gateway);
        Ok(())
    }

    /// Disconnects and returns the gateway, dropping any pending push.
    pub fn detach(&mut self) -> Option<SyncGateway> {
        let mut gateway = self.gateway.take()?;
        gateway.discard_pending();
        gateway.disconnect();
        Some(gateway)
    }

    /// Runs one command; returns the viewport focus request it produced.
    pub fn execute(&mut self, command: Command, now: Instant) -> Option<FocusRequest> {
        if self.is_read_only() {
            debug!(
                "event=command_apply module=client status=skip command={} reason=read_only",
                command.name()
            );
            return None;
        }

        let outcome = self
            .processor
            .apply(std::mem::take(&mut self.snapshot), &command);
        self.snapshot = outcome.snapshot;
        if !outcome.changed {
            return None;
        }

        if let Some(rename) = outcome.rename {
            self.rename_target = Some(rename);
        }
        self.close_stale_rename();
        if command.affects_document() {
            self.schedule_push(now);
        }

        let focus = outcome.focus.and_then(|id| self.focus_on(&id));
        if focus.is_some() {
            self.pending_focus = focus.clone();
        }
        focus
    }

    /// Interprets a key press in the current input context.
    pub fn handle_key(&mut self, key: NavKey, now: Instant) -> Option<FocusRequest> {
        if self.is_read_only() {
            return None;
        }
        let context = InputContext {
            text_input_focused: self.text_input_focused,
            rename_open: self.rename_target.is_some(),
        };
        match interpret(&self.snapshot, key, context) {
            NavAction::Ignored => None,
            NavAction::Move(node_id) => self.execute(Command::Select(node_id), now),
            NavAction::Command(command) => self.execute(command, now),
            NavAction::BeginRename(node_id) => {
                self.begin_rename(&node_id);
                None
            }
        }
    }

    /// Records whether a text field owns keyboard focus.
    pub fn set_text_input_focus(&mut self, focused: bool) {
        self.text_input_focused = focused;
    }

    /// Opens the rename modal on `node_id`.
    pub fn begin_rename(&mut self, node_id: &str) -> bool {
        if self.is_read_only() || !self.snapshot.contains(node_id) {
            return false;
        }
        self.rename_target = Some(node_id.to_string());
        true
    }

    /// Closes the rename modal and applies `label` to its target.
    pub fn commit_rename(&mut self, label: &str, now: Instant) -> bool {
        let Some(node_id) = self.rename_target.take() else {
            return false;
        };
        let before = self.snapshot.node(&node_id).map(|node| node.label.clone());
        self.execute(
            Command::Rename {
                node_id: node_id.clone(),
                label: label.to_string(),
            },
            now,
        );
        self.snapshot.node(&node_id).map(|node| node.label.clone()) != before
    }

    pub fn cancel_rename(&mut self) {
        self.rename_target = None;
    }

    /// Returns and clears the last focus request.
    pub fn take_focus_request(&mut self) -> Option<FocusRequest> {
        self.pending_focus.take()
    }

    /// Replaces the action items and pushes them with the tree.
    pub fn set_action_items(&mut self, action_items: Option<Vec<String>>, now: Instant) {
        self.action_items = action_items;
        if !self.is_read_only() {
            self.schedule_push(now);
        }
    }

    /// Advances the gateway: due pushes go out, the newest inbound snapshot
    /// is applied. Returns notices raised since the last tick.
    pub fn tick(&mut self, now: Instant) -> Vec<SyncNotice> {
        let Some(gateway) = self.gateway.as_mut() else {
            return Vec::new();
        };
        gateway.poll(now);
        let remote = gateway.drain_remote();
        let notices = gateway.take_notices();
        if let Some(remote) = remote {
            self.adopt_remote(remote);
        }
        notices
    }

    /// Pushes any pending document immediately.
    pub fn flush(&mut self) -> Option<PushOutcome> {
        self.gateway.as_mut()?.flush()
    }

    /// Stops syncing and makes the client read-only.
    pub fn freeze(&mut self) {
        if let Some(gateway) = self.gateway.as_mut() {
            gateway.discard_pending();
            gateway.disconnect();
        }
        self.rename_target = None;
        self.frozen = true;
        info!(
            "event=client_freeze module=client status=ok role={}",
            self.role.as_str()
        );
    }

    pub fn to_document(&self) -> MindMapDocument {
        MindMapDocument::from_snapshot(&self.snapshot, self.action_items.clone())
    }

    /// Builds the drawable view of the visible subset.
    pub fn view(&self) -> RenderView {
        let resolved = resolve(&self.snapshot);
        let nodes = resolved
            .visible_nodes()
            .into_iter()
            .map(|node| RenderNode {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind.clone(),
                position: node.position,
                expanded: node.expanded,
                selected: node.selected,
                has_children: !self.snapshot.children_of(&node.id).is_empty(),
            })
            .collect();
        let edges = resolved
            .edges
            .iter()
            .map(|edge| RenderEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
            })
            .collect();
        RenderView {
            nodes,
            edges,
            rename_target: self.rename_target.clone(),
            read_only: self.is_read_only(),
        }
    }

    fn schedule_push(&mut self, now: Instant) {
        let document = self.to_document();
        if let Some(gateway) = self.gateway.as_mut() {
            gateway.schedule_push(&document, now);
        }
    }

    fn adopt_remote(&mut self, remote: RemoteSnapshot) {
        let RemoteSnapshot {
            snapshot: mut next,
            action_items,
        } = remote;
        let keep = self
            .snapshot
            .selected_id()
            .filter(|id| resolve(&next).is_visible(id))
            .map(str::to_string);
        next.select_only(keep.as_deref());
        self.processor.relayout(&mut next);

        self.snapshot = next;
        self.action_items = action_items;
        self.close_stale_rename();
        debug!(
            "event=remote_apply module=client status=ok role={} nodes={} kept_selection={}",
            self.role.as_str(),
            self.snapshot.nodes.len(),
            keep.is_some()
        );
    }

    fn close_stale_rename(&mut self) {
        let stale = self
            .rename_target
            .as_deref()
            .is_some_and(|id| !self.snapshot.contains(id));
        if stale {
            self.rename_target = None;
        }
    }

    fn focus_on(&self, node_id: &str) -> Option<FocusRequest> {
        self.snapshot.node(node_id).map(|node| FocusRequest {
            node_id: node.id.clone(),
            position: node.position,
        })
    }
}
