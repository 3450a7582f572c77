//! Keyboard navigation state machine.
//!
//! # Responsibility
//! - Map key presses to selection moves, commands, or rename requests.
//!
//! # Invariants
//! - State is the selected node id (or none); moves only target visible nodes.
//! - Keys are ignored while a text input has focus or the rename modal is open.
//! - Vertical order is the cached layout `y`, ties broken by creation order.

use crate::command::Command;
use crate::model::node::NodeId;
use crate::model::snapshot::TreeSnapshot;
use crate::visibility::{resolve, ResolvedTree};
use std::cmp::Ordering;

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Tab,
    Enter,
    Delete,
    Backspace,
    Space,
    Other,
}

impl NavKey {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_key_name(key: &str) -> Self {
        match key {
            "ArrowUp" => Self::Up,
            "ArrowDown" => Self::Down,
            "ArrowLeft" => Self::Left,
            "ArrowRight" => Self::Right,
            "Tab" => Self::Tab,
            "Enter" => Self::Enter,
            "Delete" => Self::Delete,
            "Backspace" => Self::Backspace,
            " " | "Space" | "Spacebar" => Self::Space,
            _ => Self::Other,
        }
    }
}

/// Focus state of the surrounding UI at the time of the key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    /// An input/textarea element owns keyboard focus.
    pub text_input_focused: bool,
    /// The rename modal is open.
    pub rename_open: bool,
}

impl InputContext {
    pub fn accepts_tree_keys(&self) -> bool {
        !self.text_input_focused && !self.rename_open
    }
}

/// Transition produced by one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    /// Key has no effect in this state.
    Ignored,
    /// Select this node and center the viewport on it.
    Move(NodeId),
    /// Forward to the command processor.
    Command(Command),
    /// Open the rename modal for this node.
    BeginRename(NodeId),
}

/// Interprets `key` against the visible tree of `snapshot`.
pub fn interpret(snapshot: &TreeSnapshot, key: NavKey, context: InputContext) -> NavAction {
    if !context.accepts_tree_keys() {
        return NavAction::Ignored;
    }

    match key {
        NavKey::Tab => NavAction::Command(Command::AddChild),
        NavKey::Enter => NavAction::Command(Command::AddSibling),
        NavKey::Delete | NavKey::Backspace => NavAction::Command(Command::DeleteSelected),
        NavKey::Space => match snapshot.selected_id() {
            Some(id) => NavAction::BeginRename(id.to_string()),
            None => NavAction::Ignored,
        },
        NavKey::Up | NavKey::Down | NavKey::Left | NavKey::Right => {
            let resolved = resolve(snapshot);
            let target = match snapshot.selected_id() {
                Some(selected) => step(snapshot, &resolved, selected, key),
                None => first_visible_root(snapshot, &resolved),
            };
            target.map_or(NavAction::Ignored, NavAction::Move)
        }
        NavKey::Other => NavAction::Ignored,
    }
}

fn step(
    snapshot: &TreeSnapshot,
    resolved: &ResolvedTree<'_>,
    selected: &str,
    key: NavKey,
) -> Option<NodeId> {
    match key {
        NavKey::Right => {
            if !snapshot.node(selected)?.expanded {
                return None;
            }
            let children = visible_in_vertical_order(snapshot, resolved, snapshot.children_of(selected));
            children.get(children.len() / 2).map(|id| id.to_string())
        }
        NavKey::Left => snapshot.parent_of(selected).map(str::to_string),
        NavKey::Up | NavKey::Down => {
            let siblings = match snapshot.parent_of(selected) {
                Some(parent) => snapshot.children_of(parent),
                None => snapshot.roots(),
            };
            let ordered = visible_in_vertical_order(snapshot, resolved, siblings);
            let index = ordered.iter().position(|id| *id == selected)?;
            let target = if key == NavKey::Up {
                index.checked_sub(1)?
            } else {
                index + 1
            };
            ordered.get(target).map(|id| id.to_string())
        }
        _ => None,
    }
}

fn first_visible_root(snapshot: &TreeSnapshot, resolved: &ResolvedTree<'_>) -> Option<NodeId> {
    visible_in_vertical_order(snapshot, resolved, snapshot.roots())
        .first()
        .map(|id| id.to_string())
}

fn visible_in_vertical_order<'s>(
    snapshot: &'s TreeSnapshot,
    resolved: &ResolvedTree<'_>,
    ids: Vec<&'s str>,
) -> Vec<&'s str> {
    let mut entries: Vec<(f64, usize, &'s str)> = ids
        .into_iter()
        .filter(|id| resolved.is_visible(id))
        .filter_map(|id| {
            let slot = snapshot.nodes.iter().position(|node| node.id == id)?;
            Some((snapshot.nodes[slot].position.y, slot, id))
        })
        .collect();
    entries.sort_by(|left, right| {
        left.0
            .partial_cmp(&right.0)
            .unwrap_or(Ordering::Equal)
            .then(left.1.cmp(&right.1))
    });
    entries.into_iter().map(|(_, _, id)| id).collect()
}
