//! Hierarchical layout engine.
//!
//! # Responsibility
//! - Assign positions to the visible subset of a forest.
//!
//! # Invariants
//! - Pure: identical inputs always produce identical positions.
//! - Layer (x axis) is the longest-path distance from a root.
//! - Siblings keep creation order along the y axis; leaves are spaced by
//!   `node_spacing` and parents are centered on their children.
//! - Never calls back into visibility or command code.

use crate::model::node::{Edge, Node, NodeId, Position};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Spacing constants for the layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal distance between consecutive layers.
    pub layer_spacing: f64,
    /// Vertical distance between adjacent leaf slots.
    pub node_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layer_spacing: 250.0,
            node_spacing: 80.0,
        }
    }
}

/// One layout result entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedNode {
    pub id: NodeId,
    pub layer: usize,
    pub position: Position,
}

/// Lays out `nodes` using only `edges` whose endpoints are both in `nodes`.
///
/// Output order matches input order.
pub fn layout(nodes: &[&Node], edges: &[&Edge], config: &LayoutConfig) -> Vec<PositionedNode> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.id.as_str(), slot))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];
    for edge in edges {
        let (Some(&source), Some(&target)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if children[source].contains(&target) {
            continue;
        }
        children[source].push(target);
        in_degree[target] += 1;
    }

    let layers = longest_path_layers(&children, &in_degree);
    let rows = LeafSlots::assign(&children, &in_degree);

    nodes
        .iter()
        .enumerate()
        .map(|(slot, node)| PositionedNode {
            id: node.id.clone(),
            layer: layers[slot],
            position: Position::new(
                layers[slot] as f64 * config.layer_spacing,
                rows[slot] * config.node_spacing,
            ),
        })
        .collect()
}

fn longest_path_layers(children: &[Vec<usize>], in_degree: &[usize]) -> Vec<usize> {
    let mut remaining = in_degree.to_vec();
    let mut layers = vec![0usize; children.len()];
    let mut queue: VecDeque<usize> = (0..children.len())
        .filter(|&slot| in_degree[slot] == 0)
        .collect();

    while let Some(current) = queue.pop_front() {
        for &child in &children[current] {
            layers[child] = layers[child].max(layers[current] + 1);
            remaining[child] -= 1;
            if remaining[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    layers
}

/// Depth-first row assignment in fractional leaf units.
struct LeafSlots<'a> {
    children: &'a [Vec<usize>],
    rows: Vec<Option<f64>>,
    next_leaf: f64,
}

impl<'a> LeafSlots<'a> {
    fn assign(children: &'a [Vec<usize>], in_degree: &[usize]) -> Vec<f64> {
        let mut slots = Self {
            children,
            rows: vec![None; children.len()],
            next_leaf: 0.0,
        };
        for root in (0..children.len()).filter(|&slot| in_degree[slot] == 0) {
            slots.place(root);
        }
        // Only reachable for cyclic input, which validated snapshots never hold.
        for slot in 0..children.len() {
            if slots.rows[slot].is_none() {
                slots.place(slot);
            }
        }
        slots.rows.into_iter().map(|row| row.unwrap_or(0.0)).collect()
    }

    fn place(&mut self, slot: usize) -> f64 {
        if let Some(row) = self.rows[slot] {
            return row;
        }
        // Claim the slot before descending so a cycle cannot recurse forever.
        self.rows[slot] = Some(self.next_leaf);

        let children = self.children;
        let mut placed = Vec::new();
        for &child in children[slot].iter() {
            if self.rows[child].is_none() {
                placed.push(self.place(child));
            }
        }

        let row = match (placed.first(), placed.last()) {
            (Some(first), Some(last)) => (first + last) / 2.0,
            _ => {
                let row = self.next_leaf;
                self.next_leaf += 1.0;
                row
            }
        };
        self.rows[slot] = Some(row);
        row
    }
}
