//! Flat snapshot implementation of the conversation backend.
//!
//! The fallback when `SQLite` is unavailable: every record lives in an
//! in-memory map mirrored to one JSON document on disk. The document is
//! read once at startup and rewritten in full on every mutation, so a
//! write costs O(total data size).

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::{BackendKind, ConversationBackend, StoreFuture};
use crate::core::config::StoreConfig;
use crate::core::conversation::Conversation;
use crate::core::errors::{StoreError, StoreResult};
use crate::core::ids::{ProjectId, SessionId};
use crate::core::session::{Project, Session};

/// Snapshot document schema version. Bumped only on incompatible layout
/// changes; a mismatch on load is treated as corruption.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// On-disk snapshot layout: a version marker plus one key/record list per
/// record kind.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    schema_version: u32,
    conversations: Vec<(SessionId, Conversation)>,
    sessions: Vec<(SessionId, Session)>,
    projects: Vec<(ProjectId, Project)>,
}

#[derive(Debug, Default)]
struct SnapshotState {
    conversations: HashMap<SessionId, Conversation>,
    sessions: HashMap<SessionId, Session>,
    projects: HashMap<ProjectId, Project>,
}

impl SnapshotState {
    fn from_document(doc: SnapshotDocument) -> Self {
        Self {
            conversations: doc.conversations.into_iter().collect(),
            sessions: doc.sessions.into_iter().collect(),
            projects: doc.projects.into_iter().collect(),
        }
    }

    fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            conversations: self
                .conversations
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            sessions: self.sessions.iter().map(|(k, v)| (*k, v.clone())).collect(),
            projects: self.projects.iter().map(|(k, v)| (*k, v.clone())).collect(),
        }
    }
}

/// Flat persisted fallback backend.
pub struct SnapshotBackend {
    path: PathBuf,
    state: Mutex<SnapshotState>,
}

impl SnapshotBackend {
    /// Load the snapshot from disk, starting empty when the file is
    /// missing, unreadable, or carries an unexpected schema version.
    pub async fn open(config: &StoreConfig) -> Self {
        let path = config.snapshot_path.clone();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(json) => match serde_json::from_str::<SnapshotDocument>(&json) {
                Ok(doc) if doc.schema_version == SNAPSHOT_SCHEMA_VERSION => {
                    debug!(
                        "loaded snapshot with {} conversations from {}",
                        doc.conversations.len(),
                        path.display()
                    );
                    SnapshotState::from_document(doc)
                }
                Ok(doc) => {
                    warn!(
                        "snapshot at {} has schema version {}, expected {}; starting empty",
                        path.display(),
                        doc.schema_version,
                        SNAPSHOT_SCHEMA_VERSION
                    );
                    SnapshotState::default()
                }
                Err(err) => {
                    warn!(
                        "snapshot at {} is corrupt, starting empty: {err}",
                        path.display()
                    );
                    SnapshotState::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => SnapshotState::default(),
            Err(err) => {
                warn!(
                    "snapshot at {} is unreadable, starting empty: {err}",
                    path.display()
                );
                SnapshotState::default()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// Rewrite the whole snapshot document.
    async fn persist(&self, state: &SnapshotState) -> StoreResult<()> {
        let json = serde_json::to_string(&state.to_document())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;
        debug!("persisted snapshot to {}", self.path.display());
        Ok(())
    }
}

impl ConversationBackend for SnapshotBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Snapshot
    }

    fn get_conversation(
        &self,
        session_id: SessionId,
    ) -> StoreFuture<'_, StoreResult<Option<Conversation>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.conversations.get(&session_id).cloned())
        })
    }

    fn put_conversation(
        &self,
        conversation: Conversation,
        expected_revision: Option<u64>,
    ) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if let Some(expected) = expected_revision {
                let current = state.conversations.get(&conversation.session_id);
                if current.is_none_or(|stored| stored.revision != expected) {
                    return Err(StoreError::RevisionConflict {
                        session_id: conversation.session_id,
                        expected,
                    });
                }
            }
            state
                .conversations
                .insert(conversation.session_id, conversation);
            self.persist(&state).await
        })
    }

    fn conversations_for_project(
        &self,
        project_id: ProjectId,
    ) -> StoreFuture<'_, StoreResult<Vec<Conversation>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut matched: Vec<Conversation> = state
                .conversations
                .values()
                .filter(|c| c.project_id == project_id)
                .cloned()
                .collect();
            matched.sort_by_key(|c| (c.updated_at, c.session_id));
            Ok(matched)
        })
    }

    fn all_conversations(&self) -> StoreFuture<'_, StoreResult<Vec<Conversation>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut all: Vec<Conversation> = state.conversations.values().cloned().collect();
            all.sort_by_key(|c| (c.updated_at, c.session_id));
            Ok(all)
        })
    }

    fn get_session(
        &self,
        session_id: SessionId,
    ) -> StoreFuture<'_, StoreResult<Option<Session>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.sessions.get(&session_id).cloned())
        })
    }

    fn put_session(&self, session: Session) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.sessions.insert(session.id, session);
            self.persist(&state).await
        })
    }

    fn sessions_for_project(
        &self,
        project_id: ProjectId,
    ) -> StoreFuture<'_, StoreResult<Vec<Session>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut matched: Vec<Session> = state
                .sessions
                .values()
                .filter(|s| s.project_id == project_id)
                .cloned()
                .collect();
            matched.sort_by_key(|s| (s.updated_at, s.id));
            Ok(matched)
        })
    }

    fn session_count(&self) -> StoreFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.sessions.len())
        })
    }

    fn project_count(&self) -> StoreFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.projects.len())
        })
    }
}
