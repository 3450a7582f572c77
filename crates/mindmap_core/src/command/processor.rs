//! Command application against tree snapshots.

use super::Command;
use crate::config::EditorConfig;
use crate::layout::{layout, LayoutConfig};
use crate::model::node::{Edge, Node, NodeId, Position};
use crate::model::snapshot::TreeSnapshot;
use crate::visibility::resolve;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Result of applying one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// Next snapshot; equal to the input snapshot when `changed` is false.
    pub snapshot: TreeSnapshot,
    /// Node the viewport should center on after this command.
    pub focus: Option<NodeId>,
    /// Node whose label should open in an editable state.
    pub rename: Option<NodeId>,
    pub changed: bool,
}

impl CommandOutcome {
    fn unchanged(snapshot: TreeSnapshot) -> Self {
        Self {
            snapshot,
            focus: None,
            rename: None,
            changed: false,
        }
    }
}

enum Step {
    Skip(&'static str),
    Commit {
        next: TreeSnapshot,
        focus: Option<NodeId>,
        rename: Option<NodeId>,
    },
}

/// Applies commands and keeps cached positions in sync with topology.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    layout: LayoutConfig,
    default_label: String,
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), &EditorConfig::default())
    }
}

impl CommandProcessor {
    pub fn new(layout: LayoutConfig, editor: &EditorConfig) -> Self {
        Self {
            layout,
            default_label: editor.default_label.clone(),
        }
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Applies `command` to `snapshot`.
    ///
    /// Invalid contexts (nothing selected, root delete, unknown id) and
    /// candidates that fail forest validation return the input unchanged.
    pub fn apply(&self, snapshot: TreeSnapshot, command: &Command) -> CommandOutcome {
        let step = match command {
            Command::AddChild => self.add_child(&snapshot),
            Command::AddSibling => self.add_sibling(&snapshot),
            Command::DeleteSelected => self.delete_selected(&snapshot),
            Command::Rename { node_id, label } => rename(&snapshot, node_id, label),
            Command::ToggleExpand(node_id) => self.toggle_expand(&snapshot, node_id),
            Command::Select(node_id) => select(&snapshot, node_id),
            Command::ClearSelection => clear_selection(&snapshot),
        };

        match step {
            Step::Skip(reason) => {
                debug!(
                    "event=command_apply module=command status=skip command={} reason={}",
                    command.name(),
                    reason
                );
                CommandOutcome::unchanged(snapshot)
            }
            Step::Commit {
                next,
                focus,
                rename,
            } => match next.validate() {
                Ok(()) => {
                    debug!(
                        "event=command_apply module=command status=ok command={} nodes={} edges={}",
                        command.name(),
                        next.nodes.len(),
                        next.edges.len()
                    );
                    CommandOutcome {
                        snapshot: next,
                        focus,
                        rename,
                        changed: true,
                    }
                }
                Err(violation) => {
                    warn!(
                        "event=command_apply module=command status=error command={} error={}",
                        command.name(),
                        violation
                    );
                    CommandOutcome::unchanged(snapshot)
                }
            },
        }
    }

    /// Recomputes positions for the visible subset; hidden nodes keep their
    /// last position.
    pub fn relayout(&self, snapshot: &mut TreeSnapshot) {
        let positions: HashMap<NodeId, Position> = {
            let resolved = resolve(snapshot);
            let visible = resolved.visible_nodes();
            layout(&visible, &resolved.edges, &self.layout)
                .into_iter()
                .map(|entry| (entry.id, entry.position))
                .collect()
        };
        for node in &mut snapshot.nodes {
            if let Some(position) = positions.get(&node.id) {
                node.position = *position;
            }
        }
    }

    fn add_child(&self, snapshot: &TreeSnapshot) -> Step {
        let Some(parent) = snapshot.selected_id().and_then(|id| snapshot.node(id)) else {
            return Step::Skip("no_selection");
        };
        let parent_id = parent.id.clone();
        let anchor = parent.position;

        let mut next = snapshot.clone();
        let node_id = self.insert_node(&mut next, Some(&parent_id), anchor);
        created(next, node_id)
    }

    fn add_sibling(&self, snapshot: &TreeSnapshot) -> Step {
        let Some(selected) = snapshot.selected_id().and_then(|id| snapshot.node(id)) else {
            return Step::Skip("no_selection");
        };
        let parent_id = snapshot.parent_of(&selected.id).map(str::to_string);
        let anchor = selected.position;

        let mut next = snapshot.clone();
        let node_id = self.insert_node(&mut next, parent_id.as_deref(), anchor);
        created(next, node_id)
    }

    fn delete_selected(&self, snapshot: &TreeSnapshot) -> Step {
        let Some(selected) = snapshot.selected_id() else {
            return Step::Skip("no_selection");
        };
        if snapshot.is_root(selected) {
            return Step::Skip("root_protected");
        }
        let parent_id = snapshot.parent_of(selected).map(str::to_string);
        let doomed: HashSet<NodeId> = snapshot.subtree_ids(selected).into_iter().collect();

        let mut next = snapshot.clone();
        next.nodes.retain(|node| !doomed.contains(&node.id));
        next.edges
            .retain(|edge| !doomed.contains(&edge.source) && !doomed.contains(&edge.target));
        next.select_only(parent_id.as_deref());
        self.relayout(&mut next);

        debug!(
            "event=subtree_delete module=command status=ok removed_nodes={}",
            doomed.len()
        );
        Step::Commit {
            next,
            focus: parent_id,
            rename: None,
        }
    }

    fn toggle_expand(&self, snapshot: &TreeSnapshot, node_id: &str) -> Step {
        if !snapshot.contains(node_id) {
            return Step::Skip("unknown_node");
        }
        let mut next = snapshot.clone();
        if let Some(node) = next.node_mut(node_id) {
            node.expanded = !node.expanded;
        }
        self.relayout(&mut next);
        Step::Commit {
            next,
            focus: None,
            rename: None,
        }
    }

    fn insert_node(
        &self,
        next: &mut TreeSnapshot,
        parent_id: Option<&str>,
        anchor: Position,
    ) -> NodeId {
        let mut node = Node::new(self.default_label.as_str()).at(anchor);
        node.selected = true;
        let node_id = node.id.clone();

        next.select_only(None);
        next.nodes.push(node);
        if let Some(parent_id) = parent_id {
            next.edges.push(Edge::between(parent_id, node_id.as_str()));
        }
        self.relayout(next);
        node_id
    }
}

/// Commits a freshly inserted node. Focus and rename are only requested
/// when the node is drawn; under a collapsed ancestor it stays hidden.
fn created(next: TreeSnapshot, node_id: NodeId) -> Step {
    if !resolve(&next).is_visible(&node_id) {
        debug!(
            "event=node_create module=command status=ok hidden=true node_id={}",
            node_id
        );
        return Step::Commit {
            next,
            focus: None,
            rename: None,
        };
    }
    Step::Commit {
        next,
        focus: Some(node_id.clone()),
        rename: Some(node_id),
    }
}

fn rename(snapshot: &TreeSnapshot, node_id: &str, label: &str) -> Step {
    let Some(current) = snapshot.node(node_id) else {
        return Step::Skip("unknown_node");
    };
    let Some(label) = normalize_label(label) else {
        return Step::Skip("blank_label");
    };
    if current.label == label {
        return Step::Skip("label_unchanged");
    }

    let mut next = snapshot.clone();
    if let Some(node) = next.node_mut(node_id) {
        node.label = label;
    }
    Step::Commit {
        next,
        focus: None,
        rename: None,
    }
}

fn select(snapshot: &TreeSnapshot, node_id: &str) -> Step {
    if snapshot.selected_id() == Some(node_id) {
        return Step::Skip("already_selected");
    }
    if !resolve(snapshot).is_visible(node_id) {
        return Step::Skip("not_visible");
    }
    let mut next = snapshot.clone();
    next.select_only(Some(node_id));
    Step::Commit {
        next,
        focus: Some(node_id.to_string()),
        rename: None,
    }
}

fn clear_selection(snapshot: &TreeSnapshot) -> Step {
    if snapshot.selected_id().is_none() {
        return Step::Skip("no_selection");
    }
    let mut next = snapshot.clone();
    next.select_only(None);
    Step::Commit {
        next,
        focus: None,
        rename: None,
    }
}

/// Trims and collapses whitespace runs; `None` when nothing remains.
pub(crate) fn normalize_label(label: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(label.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}
