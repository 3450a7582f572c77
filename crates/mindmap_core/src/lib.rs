//! Core of the collaborative 1on1 mind map.
//! Tree topology, visibility, layout, commands, navigation and sync live
//! here; the UI shell only renders `RenderView`s and forwards input.

pub mod client;
pub mod command;
pub mod config;
pub mod db;
pub mod layout;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod repo;
pub mod session;
pub mod sync;
pub mod visibility;

pub use client::{ClientRole, FocusRequest, MindMapClient, RenderEdge, RenderNode, RenderView};
pub use command::{apply_command, Command, CommandOutcome, CommandProcessor};
pub use config::{ConfigError, CoreConfig, EditorConfig};
pub use layout::{layout, LayoutConfig, PositionedNode};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::document::{DocumentError, MindMapDocument};
pub use model::node::{Edge, EdgeId, Node, NodeId, NodeKind, Position};
pub use model::snapshot::{ForestViolation, TreeSnapshot};
pub use navigation::{interpret, InputContext, NavAction, NavKey};
pub use repo::document_repo::{HistoryEntry, SqliteDocumentStore};
pub use session::{
    MeetingSession, NoteSource, SessionError, SessionNote, SessionStatus, SessionSummary,
    SpeakerRole, Summarizer, SummaryRequest, TranscriptEvent,
};
pub use sync::gateway::{PushOutcome, RemoteSnapshot, SyncConfig, SyncGateway, SyncNotice};
pub use sync::memory_store::InMemoryDocumentStore;
pub use sync::store::{DocumentStore, SnapshotListener, StoreError, StoreResult, Subscription};
pub use visibility::{resolve, ResolvedTree};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
