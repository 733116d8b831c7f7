//! Client-side persistence for conversational sessions.
//!
//! `convostore` stores three record kinds (sessions, conversations with
//! their message history, project context and artifacts, and projects)
//! behind one uniform interface, routed to whichever backend the one-time
//! startup selection chose: a transactional `SQLite` store when available,
//! or a flat persisted JSON snapshot otherwise. On top of the record CRUD
//! it offers a naive token-scored substring search and aggregate stats.
//!
//! Modules:
//! - `core`: identifiers, record types, configuration, and errors
//! - `backend`: the storage interface and its two implementations
//! - `search`: whitespace-token relevance scoring
//! - `store`: the `ConversationStore` facade

// Strict lint discipline: no unsafe, everything public documented.
#![deny(unsafe_code)]
#![warn(missing_docs)]
// Clippy discipline for `cargo clippy` runs.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unimplemented)]
// Tests assert with unwrap; production code never does.
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backend;
pub mod core;
pub mod search;
pub mod store;

// Re-export commonly used types for convenience
pub use backend::{
    BackendKind, ConversationBackend, SnapshotBackend, SqliteBackend, StoreFuture, select_backend,
};
pub use crate::core::{
    AgentRole, Artifact, ArtifactDraft, ArtifactId, ArtifactKind, ContextEntry, ContextKind,
    Conversation, Message, MessageDraft, MessageId, MessageKind, Project, ProjectId, Session,
    SessionId, StoreConfig, StoreError, StoreResult,
};
pub use search::{SearchHit, score_content, search_messages};
pub use store::{ConversationContext, ConversationStore, StoreStats};
