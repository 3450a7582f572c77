//! Document synchronization.
//!
//! # Responsibility
//! - Define the persistence/realtime collaborator contract.
//! - Debounce outbound snapshot pushes and apply inbound snapshots.
//!
//! # Invariants
//! - Consistency is last-writer-wins at whole-snapshot granularity.
//! - No field-level merge is attempted.

pub mod gateway;
pub mod memory_store;
pub mod store;
