//! Command processor.
//!
//! # Responsibility
//! - Define the mutation commands the editing surface can issue.
//! - Apply them to a snapshot, re-running visibility and layout.
//!
//! # Invariants
//! - Commands are total: each yields a valid next snapshot or is a no-op.
//! - A rejected command never leaves a partially mutated snapshot.
//!
//! # See also
//! - `navigation` for the keyboard mapping onto these commands.

mod processor;

pub use processor::{CommandOutcome, CommandProcessor};

use crate::model::node::NodeId;
use crate::model::snapshot::TreeSnapshot;

/// One mutation request against the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a child under the selected node.
    AddChild,
    /// Create a sibling of the selected node; a root's sibling is a new root.
    AddSibling,
    /// Remove the selected non-root node and its whole subtree.
    DeleteSelected,
    /// Replace the label of one node.
    Rename { node_id: NodeId, label: String },
    /// Flip the expand flag of one node.
    ToggleExpand(NodeId),
    /// Select one visible node.
    Select(NodeId),
    /// Deselect everything.
    ClearSelection,
}

impl Command {
    /// Stable name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddChild => "add_child",
            Self::AddSibling => "add_sibling",
            Self::DeleteSelected => "delete_selected",
            Self::Rename { .. } => "rename",
            Self::ToggleExpand(_) => "toggle_expand",
            Self::Select(_) => "select",
            Self::ClearSelection => "clear_selection",
        }
    }

    /// Whether a successful run changes the persisted document.
    ///
    /// Selection lives only in the local client.
    pub fn affects_document(&self) -> bool {
        !matches!(self, Self::Select(_) | Self::ClearSelection)
    }
}

/// Applies `command` with default layout and editor settings.
pub fn apply_command(snapshot: TreeSnapshot, command: &Command) -> CommandOutcome {
    CommandProcessor::default().apply(snapshot, command)
}
