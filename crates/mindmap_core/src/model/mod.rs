//! Mind-map document model.
//!
//! # Responsibility
//! - Define the node/edge records shared by every core component.
//! - Hold the tree store snapshot and its forest invariant checks.
//! - Map snapshots to and from the persisted/transmitted document shape.
//!
//! # Invariants
//! - Node ids are unique and stable for the node lifetime.
//! - Edges are directed parent -> child and never form a cycle.
//! - At most one node is selected at a time.

pub mod document;
pub mod node;
pub mod snapshot;
