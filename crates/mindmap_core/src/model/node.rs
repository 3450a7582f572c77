//! Node and edge records.
//!
//! # Responsibility
//! - Define the typed node payload (label, expand flag, kind) that replaces
//!   free-form per-node data maps.
//! - Generate stable ids for command-created nodes and edges.
//!
//! # Invariants
//! - `position` is a cache of the last layout pass, never user-edited.
//! - `selected` is local UI state and is not part of the wire document.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable node identifier.
pub type NodeId = String;

/// Stable edge identifier.
pub type EdgeId = String;

/// Canvas coordinates produced by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node presentation kind, serialized as the wire `type` string.
///
/// `Custom` is the extension point for kinds this core does not interpret;
/// they round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// Session topic root.
    Input,
    /// Regular topic node.
    #[default]
    Default,
    /// Terminal node.
    Output,
    /// Kind string unknown to the core.
    Custom(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Input => "input",
            Self::Default => "default",
            Self::Output => "output",
            Self::Custom(value) => value.as_str(),
        }
    }
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "input" => Self::Input,
            "default" | "" => Self::Default,
            "output" => Self::Output,
            _ => Self::Custom(value),
        }
    }
}

impl From<NodeKind> for String {
    fn from(value: NodeKind) -> Self {
        match value {
            NodeKind::Custom(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One labelled topic in the mind map.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    /// Last layout output for this node.
    pub position: Position,
    /// Controls whether this node's children are visible.
    pub expanded: bool,
    pub selected: bool,
}

impl Node {
    /// Creates a regular node with a generated UUID id.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), label)
    }

    /// Creates a node with a caller-provided id.
    ///
    /// Used by document import and tests where identity already exists.
    pub fn with_id(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Default,
            position: Position::ORIGIN,
            expanded: true,
            selected: false,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// Directed parent -> child relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    /// Creates an edge whose id is derived from its endpoints.
    pub fn between(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: edge_id_for(&source, &target),
            source,
            target,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Returns the canonical edge id for a `(source, target)` pair.
pub fn edge_id_for(source: &str, target: &str) -> EdgeId {
    format!("e{source}-{target}")
}

#[cfg(test)]
mod tests {
    use super::{edge_id_for, Edge, Node, NodeKind};

    #[test]
    fn node_kind_round_trips_unknown_strings() {
        assert_eq!(NodeKind::from("input".to_string()), NodeKind::Input);
        assert_eq!(NodeKind::from(String::new()), NodeKind::Default);
        let custom = NodeKind::from("group".to_string());
        assert_eq!(custom, NodeKind::Custom("group".to_string()));
        assert_eq!(String::from(custom), "group");
    }

    #[test]
    fn generated_node_ids_are_unique_and_expanded_by_default() {
        let first = Node::new("A");
        let second = Node::new("A");
        assert_ne!(first.id, second.id);
        assert!(first.expanded);
        assert!(!first.selected);
    }

    #[test]
    fn edge_ids_derive_from_endpoints() {
        let edge = Edge::between("1", "2");
        assert_eq!(edge.id, edge_id_for("1", "2"));
        assert_eq!(edge.id, "e1-2");
        assert!(edge.touches("1"));
        assert!(!edge.touches("3"));
    }
}
