//! Persistence implementations backed by SQLite.
//!
//! # Responsibility
//! - Implement the document store contract on top of migrated connections.
//! - Keep SQL details out of the sync and session layers.
//!
//! # Invariants
//! - Stores only accept connections at the latest schema version.

pub mod document_repo;
