//! Persisted/transmitted mind-map document.
//!
//! # Responsibility
//! - Define the JSON shape exchanged with the persistence collaborator.
//! - Convert between that shape and `TreeSnapshot`.
//! - Reject malformed inbound payloads without touching local state.
//!
//! # Invariants
//! - `nodes` and `edges` arrays are required on input.
//! - Selection is local UI state and never serialized.
//! - `actionItems` is carried through untouched; the core never edits it.

use crate::model::node::{Edge, Node, NodeId, NodeKind, Position};
use crate::model::snapshot::{ForestViolation, TreeSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors for inbound documents.
#[derive(Debug)]
pub enum DocumentError {
    /// Payload is not a JSON object.
    NotAnObject,
    /// Required array field is absent or not an array.
    MissingArray(&'static str),
    /// Payload has the right top-level shape but invalid entries.
    Malformed(serde_json::Error),
    /// Payload decodes but violates the forest invariant.
    Forest(ForestViolation),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "mind-map document must be a JSON object"),
            Self::MissingArray(field) => {
                write!(f, "mind-map document is missing `{field}` array")
            }
            Self::Malformed(err) => write!(f, "malformed mind-map document: {err}"),
            Self::Forest(err) => write!(f, "invalid mind-map topology: {err}"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Forest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

impl From<ForestViolation> for DocumentError {
    fn from(value: ForestViolation) -> Self {
        Self::Forest(value)
    }
}

/// Wire payload of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    /// Serialized as `type` to match the external schema.
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
}

/// Typed node payload. Unknown keys from other writers are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    /// Absent means expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
}

/// Full mind-map document as stored by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapDocument {
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<String>>,
}

impl MindMapDocument {
    /// Builds the wire document for a snapshot.
    pub fn from_snapshot(snapshot: &TreeSnapshot, action_items: Option<Vec<String>>) -> Self {
        let nodes = snapshot
            .nodes
            .iter()
            .map(|node| DocumentNode {
                id: node.id.clone(),
                position: node.position,
                data: NodeData {
                    label: node.label.clone(),
                    expanded: Some(node.expanded),
                },
                kind: node.kind.clone(),
            })
            .collect();
        Self {
            nodes,
            edges: snapshot.edges.clone(),
            action_items,
        }
    }

    /// Parses an inbound JSON value.
    ///
    /// # Errors
    /// - `NotAnObject` / `MissingArray` when the top-level shape is wrong.
    /// - `Malformed` when entries cannot be decoded.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let object = value.as_object().ok_or(DocumentError::NotAnObject)?;
        for field in ["nodes", "edges"] {
            if !object.get(field).is_some_and(Value::is_array) {
                return Err(DocumentError::MissingArray(field));
            }
        }
        Ok(Self::deserialize(value)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Converts into a validated snapshot with nothing selected.
    ///
    /// # Errors
    /// - `Forest` when the topology has cycles, dangling edges, or
    ///   duplicate ids.
    pub fn into_snapshot(self) -> Result<(TreeSnapshot, Option<Vec<String>>), DocumentError> {
        let nodes = self
            .nodes
            .into_iter()
            .map(|node| Node {
                id: node.id,
                label: node.data.label,
                kind: node.kind,
                position: node.position,
                expanded: node.data.expanded.unwrap_or(true),
                selected: false,
            })
            .collect();
        let snapshot = TreeSnapshot::new(nodes, self.edges);
        snapshot.validate()?;
        Ok((snapshot, self.action_items))
    }
}
