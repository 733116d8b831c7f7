//! Error types for the conversation store.

use thiserror::Error;

use crate::core::ids::SessionId;

/// Conversation store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A stored record failed a decoding or range check.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
    /// The requested session has no conversation record.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    /// A concurrent writer updated the conversation first.
    #[error("conversation revision conflict for session {session_id}: expected revision {expected}")]
    RevisionConflict {
        /// Session whose conversation was contended.
        session_id: SessionId,
        /// Revision the losing writer read before its update.
        expected: u64,
    },
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
