//! Tree store snapshot.
//!
//! # Responsibility
//! - Hold the `(nodes, edges)` pair for one open document.
//! - Answer topology queries (parent, children, roots, descendants).
//! - Validate the forest invariant before a candidate snapshot is committed.
//!
//! # Invariants
//! - Node order is creation order; roots are ordered by it.
//! - Edge order is creation order; children are ordered by it.
//! - A committed snapshot always passes `validate()`.

use crate::model::node::{Edge, Node, NodeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Forest invariant violation found by `TreeSnapshot::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestViolation {
    /// Two nodes share one id.
    DuplicateNodeId(NodeId),
    /// Edge endpoint refers to a node that does not exist.
    DanglingEdge { edge_id: String, endpoint: NodeId },
    /// Following outgoing edges from this node revisits it.
    Cycle(NodeId),
    /// More than one node is marked selected.
    MultipleSelection(usize),
}

impl Display for ForestViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNodeId(id) => write!(f, "duplicate node id: {id}"),
            Self::DanglingEdge { edge_id, endpoint } => {
                write!(f, "edge {edge_id} points at missing node {endpoint}")
            }
            Self::Cycle(id) => write!(f, "cycle detected through node {id}"),
            Self::MultipleSelection(count) => {
                write!(f, "{count} nodes selected; at most one is allowed")
            }
        }
    }
}

impl Error for ForestViolation {}

/// Point-in-time state of one mind-map document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl TreeSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Creates a document holding a single root node.
    pub fn with_root(root: Node) -> Self {
        Self::new(vec![root], Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    /// Returns the id of the selected node, if any.
    pub fn selected_id(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| node.selected)
            .map(|node| node.id.as_str())
    }

    /// Returns the first parent of `node_id` by edge order.
    pub fn parent_of(&self, node_id: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|edge| edge.target == node_id)
            .map(|edge| edge.source.as_str())
    }

    /// Returns direct children of `node_id` in edge creation order.
    ///
    /// Duplicate edges to the same child are reported once.
    pub fn children_of(&self, node_id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|edge| edge.source == node_id)
            .map(|edge| edge.target.as_str())
            .filter(|target| seen.insert(*target))
            .collect()
    }

    /// A root is a node with no incoming edge.
    pub fn is_root(&self, node_id: &str) -> bool {
        !self.edges.iter().any(|edge| edge.target == node_id)
    }

    /// Returns root ids in node creation order.
    pub fn roots(&self) -> Vec<&str> {
        let targets: HashSet<&str> = self.edges.iter().map(|edge| edge.target.as_str()).collect();
        self.nodes
            .iter()
            .map(|node| node.id.as_str())
            .filter(|id| !targets.contains(id))
            .collect()
    }

    /// Returns `node_id` followed by every node reachable via outgoing edges.
    pub fn subtree_ids(&self, node_id: &str) -> Vec<NodeId> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            children
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([node_id]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current.to_string());
            if let Some(next) = children.get(current) {
                queue.extend(next.iter().copied());
            }
        }
        order
    }

    /// Clears every selection flag, then selects `node_id` when present.
    pub(crate) fn select_only(&mut self, node_id: Option<&str>) {
        for node in &mut self.nodes {
            node.selected = node_id.is_some_and(|id| id == node.id);
        }
    }

    /// Checks the forest invariant.
    ///
    /// # Errors
    /// - Duplicate node ids.
    /// - Edges with a missing source or target.
    /// - Any directed cycle.
    /// - More than one selected node.
    pub fn validate(&self) -> Result<(), ForestViolation> {
        let mut ids: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(ForestViolation::DuplicateNodeId(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ForestViolation::DanglingEdge {
                        edge_id: edge.id.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }

        if let Some(node_id) = self.first_node_on_cycle() {
            return Err(ForestViolation::Cycle(node_id));
        }

        let selected = self.nodes.iter().filter(|node| node.selected).count();
        if selected > 1 {
            return Err(ForestViolation::MultipleSelection(selected));
        }
        Ok(())
    }

    // Kahn's algorithm; anything left with non-zero in-degree sits on or
    // behind a cycle.
    fn first_node_on_cycle(&self) -> Option<NodeId> {
        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), 0))
            .collect();
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            *in_degree.entry(edge.target.as_str()).or_default() += 1;
            outgoing
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .filter(|id| in_degree.get(id).copied() == Some(0))
            .collect();
        while let Some(current) = queue.pop_front() {
            for target in outgoing.get(current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*target);
                    }
                }
            }
        }

        self.nodes
            .iter()
            .find(|node| in_degree.get(node.id.as_str()).copied().unwrap_or(0) > 0)
            .map(|node| node.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{ForestViolation, TreeSnapshot};
    use crate::model::node::{Edge, Node};

    fn chain() -> TreeSnapshot {
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
    fn topology_queries_follow_creation_order() {
        let snapshot = chain();
        assert_eq!(snapshot.roots(), vec!["r"]);
        assert_eq!(snapshot.children_of("r"), vec!["a", "c"]);
        assert_eq!(snapshot.parent_of("b"), Some("a"));
        assert!(snapshot.is_root("r"));
        assert!(!snapshot.is_root("c"));
        assert_eq!(snapshot.subtree_ids("a"), vec!["a", "b"]);
    }

    #[test]
    fn validate_accepts_forest_with_multiple_roots() {
        let mut snapshot = chain();
        snapshot.nodes.push(Node::with_id("other", "other root"));
        snapshot.validate().expect("forest should validate");
        assert_eq!(snapshot.roots(), vec!["r", "other"]);
    }

    #[test]
    fn validate_rejects_cycles() {
        let mut snapshot = chain();
        snapshot.edges.push(Edge::between("b", "r"));
        assert!(matches!(
            snapshot.validate(),
            Err(ForestViolation::Cycle(_))
        ));
    }

    #[test]
    fn validate_rejects_self_loop() {
        let mut snapshot = chain();
        snapshot.edges.push(Edge::between("c", "c"));
        assert_eq!(
            snapshot.validate(),
            Err(ForestViolation::Cycle("c".to_string()))
        );
    }

    #[test]
    fn validate_rejects_dangling_edges_and_duplicate_ids() {
        let mut dangling = chain();
        dangling.edges.push(Edge::between("c", "missing"));
        assert!(matches!(
            dangling.validate(),
            Err(ForestViolation::DanglingEdge { endpoint, .. }) if endpoint == "missing"
        ));

        let mut duplicate = chain();
        duplicate.nodes.push(Node::with_id("a", "copy"));
        assert_eq!(
            duplicate.validate(),
            Err(ForestViolation::DuplicateNodeId("a".to_string()))
        );
    }

    #[test]
    fn validate_rejects_multiple_selection() {
        let mut snapshot = chain();
        snapshot.nodes[0].selected = true;
        snapshot.nodes[1].selected = true;
        assert_eq!(
            snapshot.validate(),
            Err(ForestViolation::MultipleSelection(2))
        );

        snapshot.select_only(Some("c"));
        snapshot.validate().expect("single selection should validate");
        assert_eq!(snapshot.selected_id(), Some("c"));
    }
}
