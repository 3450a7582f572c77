//! Meeting session lifecycle around one shared mind map.
//!
//! # Responsibility
//! - Seed a new session document with a single `Input` root.
//! - Record transcript lines and manual notes as plain notes, never as
//!   tree nodes.
//! - End a session: summarize, persist the final document with action
//!   items, freeze it as history.
//!
//! # Invariants
//! - Only `Live` sessions accept notes or can be ended.
//! - A failed summary never blocks ending; it yields no summary and no
//!   action items.
//! - A failed final save leaves the session `Live` and the client writable.

use crate::client::MindMapClient;
use crate::config::{CoreConfig, EditorConfig};
use crate::model::document::MindMapDocument;
use crate::model::node::{Node, NodeKind};
use crate::model::snapshot::TreeSnapshot;
use crate::sync::gateway::SyncGateway;
use crate::sync::store::{normalize_document_id, DocumentStore, StoreError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Id of the seeded root node.
pub const SEED_ROOT_ID: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Live,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    Manager,
    Subordinate,
}

/// One line from the transcript producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub speaker: SpeakerRole,
    pub text: String,
    /// Producer-formatted time of the utterance.
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSource {
    Manual,
    Ai,
    Transcript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNote {
    pub id: String,
    pub content: String,
    pub source: NoteSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<SpeakerRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Outcome of summarization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub summary: Option<String>,
    pub action_items: Vec<String>,
}

/// Input handed to a `Summarizer`.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub theme: &'a str,
    pub transcript: &'a [TranscriptEvent],
}

/// External summarization collaborator.
pub trait Summarizer {
    fn summarize(&self, request: &SummaryRequest<'_>) -> Result<SessionSummary, String>;
}

#[derive(Debug)]
pub enum SessionError {
    /// Session already ended.
    NotLive(String),
    /// Note content is blank.
    EmptyNote,
    Store(StoreError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLive(id) => write!(f, "session is not live: {id}"),
            Self::EmptyNote => write!(f, "note content cannot be blank"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(value: serde_json::Error) -> Self {
        Self::Store(StoreError::Serialization(value))
    }
}

/// One 1on1 session and its notes.
#[derive(Debug, Clone)]
pub struct MeetingSession {
    id: String,
    theme: String,
    root_label: String,
    status: SessionStatus,
    transcript: Vec<TranscriptEvent>,
    notes: Vec<SessionNote>,
    summary: Option<SessionSummary>,
}

impl MeetingSession {
    /// Starts a live session; a blank `theme` uses the configured default.
    pub fn start(
        id: &str,
        theme: Option<&str>,
        editor: &EditorConfig,
    ) -> Result<Self, SessionError> {
        let id = normalize_document_id(id)?.to_string();
        let theme = theme
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(editor.default_theme.as_str())
            .to_string();
        let root_label = editor.root_label(Some(&theme));
        info!(
            "event=session_start module=session status=ok session_id={}",
            id
        );
        Ok(Self {
            id,
            theme,
            root_label,
            status: SessionStatus::Live,
            transcript: Vec::new(),
            notes: Vec::new(),
            summary: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn notes(&self) -> &[SessionNote] {
        &self.notes
    }

    pub fn transcript(&self) -> &[TranscriptEvent] {
        &self.transcript
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Initial document: one selected `Input` root.
    pub fn seed_snapshot(&self) -> TreeSnapshot {
        let mut root =
            Node::with_id(SEED_ROOT_ID, self.root_label.as_str()).with_kind(NodeKind::Input);
        root.selected = true;
        TreeSnapshot::with_root(root)
    }

    /// Creates the editing client for this session and connects it to `store`.
    ///
    /// A document already stored under the session id wins over the seed.
    pub fn open_editor(
        &self,
        store: Arc<dyn DocumentStore>,
        config: &CoreConfig,
        now: Instant,
    ) -> Result<MindMapClient, SessionError> {
        let mut client = MindMapClient::editor(self.seed_snapshot(), config);
        client.attach(SyncGateway::new(store, self.id.as_str(), &config.sync), now)?;
        Ok(client)
    }

    /// Creates a read-only mirror of this session's document.
    pub fn open_viewer(
        &self,
        store: Arc<dyn DocumentStore>,
        config: &CoreConfig,
        now: Instant,
    ) -> Result<MindMapClient, SessionError> {
        let mut client = MindMapClient::viewer(config);
        client.attach(SyncGateway::new(store, self.id.as_str(), &config.sync), now)?;
        Ok(client)
    }

    /// Records a transcript line as a note.
    pub fn append_transcript(
        &mut self,
        event: TranscriptEvent,
    ) -> Result<&SessionNote, SessionError> {
        self.ensure_live()?;
        let content = event.text.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyNote);
        }
        let note = SessionNote {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            source: NoteSource::Transcript,
            speaker: Some(event.speaker),
            timestamp: Some(event.timestamp.clone()),
        };
        self.transcript.push(event);
        Ok(self.push_note(note))
    }

    /// Adds a manual or assistant-generated note.
    pub fn add_note(
        &mut self,
        content: &str,
        source: NoteSource,
    ) -> Result<&SessionNote, SessionError> {
        self.ensure_live()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyNote);
        }
        let note = SessionNote {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            source,
            speaker: None,
            timestamp: None,
        };
        Ok(self.push_note(note))
    }

    /// Ends the session.
    ///
    /// Saves `client`'s current tree with the summarized action items,
    /// freezes the stored document, and freezes `client`.
    pub fn end(
        &mut self,
        client: &mut MindMapClient,
        store: &dyn DocumentStore,
        summarizer: Option<&dyn Summarizer>,
    ) -> Result<&SessionSummary, SessionError> {
        self.ensure_live()?;
        info!(
            "event=session_end module=session status=start session_id={} transcript_lines={}",
            self.id,
            self.transcript.len()
        );

        let summary = self.summarize(summarizer);
        let document =
            MindMapDocument::from_snapshot(client.snapshot(), Some(summary.action_items.clone()));
        store.save(&self.id, &document.to_value()?)?;
        store.freeze(&self.id)?;

        client.freeze();
        client.set_action_items(Some(summary.action_items.clone()), Instant::now());
        self.status = SessionStatus::Completed;
        info!(
            "event=session_end module=session status=ok session_id={} action_items={}",
            self.id,
            summary.action_items.len()
        );
        Ok(self.summary.insert(summary))
    }

    fn summarize(&self, summarizer: Option<&dyn Summarizer>) -> SessionSummary {
        let Some(summarizer) = summarizer else {
            return SessionSummary::default();
        };
        let request = SummaryRequest {
            theme: &self.theme,
            transcript: &self.transcript,
        };
        match summarizer.summarize(&request) {
            Ok(summary) => SessionSummary {
                summary: summary
                    .summary
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty()),
                action_items: summary
                    .action_items
                    .into_iter()
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
            },
            Err(err) => {
                warn!(
                    "event=session_summarize module=session status=error session_id={} error={}",
                    self.id, err
                );
                SessionSummary::default()
            }
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Live {
            Ok(())
        } else {
            Err(SessionError::NotLive(self.id.clone()))
        }
    }

    fn push_note(&mut self, note: SessionNote) -> &SessionNote {
        self.notes.push(note);
        &self.notes[self.notes.len() - 1]
    }
}
