//! Visibility resolver.
//!
//! # Responsibility
//! - Derive which nodes and edges are visible from expand/collapse flags.
//!
//! # Invariants
//! - A node is hidden iff some ancestor has `expanded = false`.
//! - Roots are never hidden; their own flag only affects descendants.
//! - An edge is visible iff both endpoints are visible.
//! - Read-only over the snapshot; never mutates or creates nodes.

use crate::model::node::{Edge, Node};
use crate::model::snapshot::TreeSnapshot;
use std::collections::{HashMap, HashSet};

/// Node paired with its derived visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNode<'a> {
    pub node: &'a Node,
    pub hidden: bool,
}

/// Resolver output for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTree<'a> {
    /// Every node in snapshot order.
    pub nodes: Vec<ResolvedNode<'a>>,
    /// Visible edges in snapshot order.
    pub edges: Vec<&'a Edge>,
    hidden: HashSet<&'a str>,
}

impl<'a> ResolvedTree<'a> {
    pub fn is_hidden(&self, node_id: &str) -> bool {
        self.hidden.contains(node_id)
    }

    /// Returns `true` for existing, non-hidden nodes.
    pub fn is_visible(&self, node_id: &str) -> bool {
        self.nodes
            .iter()
            .any(|entry| !entry.hidden && entry.node.id == node_id)
    }

    pub fn visible_nodes(&self) -> Vec<&'a Node> {
        self.nodes
            .iter()
            .filter(|entry| !entry.hidden)
            .map(|entry| entry.node)
            .collect()
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }
}

/// Resolves visibility for every node of `snapshot`.
///
/// Runs in O(N * depth); documents hold tens of nodes.
pub fn resolve(snapshot: &TreeSnapshot) -> ResolvedTree<'_> {
    let expanded: HashMap<&str, bool> = snapshot
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node.expanded))
        .collect();

    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &snapshot.edges {
        if expanded.contains_key(edge.source.as_str()) {
            parents
                .entry(edge.target.as_str())
                .or_default()
                .push(edge.source.as_str());
        }
    }

    let mut hidden = HashSet::new();
    for node in &snapshot.nodes {
        if has_collapsed_ancestor(node.id.as_str(), &parents, &expanded) {
            hidden.insert(node.id.as_str());
        }
    }

    let nodes = snapshot
        .nodes
        .iter()
        .map(|node| ResolvedNode {
            node,
            hidden: hidden.contains(node.id.as_str()),
        })
        .collect();
    let edges = snapshot
        .edges
        .iter()
        .filter(|edge| {
            expanded.contains_key(edge.source.as_str())
                && expanded.contains_key(edge.target.as_str())
                && !hidden.contains(edge.source.as_str())
                && !hidden.contains(edge.target.as_str())
        })
        .collect();

    ResolvedTree {
        nodes,
        edges,
        hidden,
    }
}

fn has_collapsed_ancestor(
    node_id: &str,
    parents: &HashMap<&str, Vec<&str>>,
    expanded: &HashMap<&str, bool>,
) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = parents.get(node_id).cloned().unwrap_or_default();
    while let Some(ancestor) = stack.pop() {
        if !visited.insert(ancestor) {
            continue;
        }
        if !expanded.get(ancestor).copied().unwrap_or(true) {
            return true;
        }
        if let Some(next) = parents.get(ancestor) {
            stack.extend(next.iter().copied());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::resolve;
    use crate::model::node::{Edge, Node};
    use crate::model::snapshot::TreeSnapshot;

    fn tree() -> TreeSnapshot {
        TreeSnapshot::new(
            vec![
                Node::with_id("r", "root"),
                Node::with_id("a", "a"),
                Node::with_id("b", "b"),
                Node::with_id("c", "c"),
            ],
            vec![
                Edge::between("r", "a"),
                Edge::between("a", "b"),
                Edge::between("r", "c"),
            ],
        )
    }

    #[test]
    fn everything_is_visible_when_expanded() {
        let snapshot = tree();
        let resolved = resolve(&snapshot);
        assert_eq!(resolved.hidden_count(), 0);
        assert_eq!(resolved.edges.len(), 3);
    }

    #[test]
    fn collapsing_hides_transitive_descendants_only() {
        let mut snapshot = tree();
        snapshot.nodes[1].expanded = false;
        let resolved = resolve(&snapshot);
        assert!(!resolved.is_hidden("a"));
        assert!(resolved.is_hidden("b"));
        assert!(!resolved.is_hidden("c"));
        assert_eq!(resolved.edges.len(), 2);
    }

    #[test]
    fn collapsed_root_stays_visible() {
        let mut snapshot = tree();
        snapshot.nodes[0].expanded = false;
        let resolved = resolve(&snapshot);
        assert!(!resolved.is_hidden("r"));
        assert!(resolved.is_visible("r"));
        let visible: Vec<_> = resolved.visible_nodes().iter().map(|n| n.id.clone()).collect();
        assert_eq!(visible, vec!["r".to_string()]);
        assert!(resolved.edges.is_empty());
    }

    #[test]
    fn collapsed_grandparent_hides_even_if_parent_expanded() {
        let mut snapshot = tree();
        snapshot.nodes[0].expanded = false;
        snapshot.nodes[1].expanded = true;
        let resolved = resolve(&snapshot);
        assert!(resolved.is_hidden("b"));
    }
}
