//! Storage backends for conversation records.
//!
//! One uniform interface, two concrete implementations: a transactional
//! `SQLite` store (preferred) and a flat JSON snapshot (fallback). The
//! backend is chosen once at startup and never migrated at runtime.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::StoreConfig;
use crate::core::conversation::Conversation;
use crate::core::errors::StoreResult;
use crate::core::ids::{ProjectId, SessionId};
use crate::core::session::Session;

pub mod snapshot;
pub mod sqlite;

pub use snapshot::SnapshotBackend;
pub use sqlite::SqliteBackend;

/// Boxed future type for backend operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which backend the one-time startup selection chose.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackendKind {
    /// Transactional indexed `SQLite` store.
    Sqlite,
    /// Flat persisted JSON snapshot.
    Snapshot,
}

impl BackendKind {
    /// Stable string representation (for logs).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniform storage interface every store operation routes through.
pub trait ConversationBackend: Send + Sync {
    /// Which concrete backend this is.
    fn kind(&self) -> BackendKind;

    /// Get a conversation by session id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_conversation(
        &self,
        session_id: SessionId,
    ) -> StoreFuture<'_, StoreResult<Option<Conversation>>>;

    /// Write a full conversation record.
    ///
    /// With `expected_revision` of `None` the write inserts or overwrites
    /// unconditionally. With `Some(n)` it only succeeds if the stored
    /// revision still equals `n`, failing with
    /// [`crate::core::StoreError::RevisionConflict`] otherwise.
    ///
    /// # Errors
    /// Returns an error if storage access fails or the revision check loses.
    fn put_conversation(
        &self,
        conversation: Conversation,
        expected_revision: Option<u64>,
    ) -> StoreFuture<'_, StoreResult<()>>;

    /// All conversations belonging to a project, oldest update first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn conversations_for_project(
        &self,
        project_id: ProjectId,
    ) -> StoreFuture<'_, StoreResult<Vec<Conversation>>>;

    /// Every stored conversation, oldest update first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn all_conversations(&self) -> StoreFuture<'_, StoreResult<Vec<Conversation>>>;

    /// Get a session by id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_session(&self, session_id: SessionId)
    -> StoreFuture<'_, StoreResult<Option<Session>>>;

    /// Insert or overwrite a session record.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn put_session(&self, session: Session) -> StoreFuture<'_, StoreResult<()>>;

    /// All sessions belonging to a project, oldest update first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn sessions_for_project(
        &self,
        project_id: ProjectId,
    ) -> StoreFuture<'_, StoreResult<Vec<Session>>>;

    /// Number of stored sessions.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn session_count(&self) -> StoreFuture<'_, StoreResult<usize>>;

    /// Number of stored projects.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn project_count(&self) -> StoreFuture<'_, StoreResult<usize>>;
}

/// Probe for the durable backend, demoting to the snapshot fallback.
///
/// A `SQLite` open or migration failure is absorbed here rather than
/// surfaced; once made, the choice holds for the lifetime of the store.
///
/// # Errors
/// Returns an error only if the fallback itself cannot be constructed.
pub async fn select_backend(config: &StoreConfig) -> StoreResult<Arc<dyn ConversationBackend>> {
    match SqliteBackend::open(config).await {
        Ok(backend) => {
            info!("conversation store using sqlite backend");
            Ok(Arc::new(backend))
        }
        Err(err) => {
            warn!("sqlite backend unavailable, falling back to snapshot store: {err}");
            let backend = SnapshotBackend::open(config).await;
            Ok(Arc::new(backend))
        }
    }
}
