//! `SQLite` implementation of the conversation backend.
//!
//! Each record kind lives in its own table, keyed by id, with the full
//! record as a JSON document column next to the indexed key columns.
//! Timestamps are stored as epoch milliseconds.

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::backend::{BackendKind, ConversationBackend, StoreFuture};
use crate::core::config::StoreConfig;
use crate::core::conversation::Conversation;
use crate::core::errors::{StoreError, StoreResult};
use crate::core::ids::{ProjectId, SessionId};
use crate::core::session::Session;

/// Transactional indexed backend over `SQLite`.
pub struct SqliteBackend {
    conn: Connection,
    conversation_table: String,
    session_table: String,
    project_table: String,
}

impl SqliteBackend {
    /// Open the database and create tables and indexes on first use.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        let conversation_table = config.conversation_table.clone();
        let session_table = config.session_table.clone();
        let project_table = config.project_table.clone();

        let conversations = conversation_table.clone();
        let sessions = session_table.clone();
        let projects = project_table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {conversations} (
                    session_id TEXT PRIMARY KEY,
                    project_id TEXT NOT NULL,
                    revision INTEGER NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{conversations}_project
                    ON {conversations} (project_id);
                CREATE INDEX IF NOT EXISTS idx_{conversations}_updated
                    ON {conversations} (updated_at);
                CREATE TABLE IF NOT EXISTS {sessions} (
                    session_id TEXT PRIMARY KEY,
                    project_id TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{sessions}_project
                    ON {sessions} (project_id);
                CREATE TABLE IF NOT EXISTS {projects} (
                    project_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{projects}_name
                    ON {projects} (name);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            conversation_table,
            session_table,
            project_table,
        })
    }

    fn decode_conversations(docs: Vec<String>) -> StoreResult<Vec<Conversation>> {
        let mut conversations = Vec::with_capacity(docs.len());
        for doc in docs {
            conversations.push(serde_json::from_str(&doc)?);
        }
        Ok(conversations)
    }
}

impl ConversationBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn get_conversation(
        &self,
        session_id: SessionId,
    ) -> StoreFuture<'_, StoreResult<Option<Conversation>>> {
        Box::pin(async move {
            let table = self.conversation_table.clone();
            let doc = self
                .conn
                .call(move |conn| {
                    let doc: Option<String> = conn
                        .query_row(
                            &format!("SELECT doc FROM {table} WHERE session_id = ?1"),
                            rusqlite::params![session_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(doc)
                })
                .await?;

            match doc {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn put_conversation(
        &self,
        conversation: Conversation,
        expected_revision: Option<u64>,
    ) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let table = self.conversation_table.clone();
            let session_id = conversation.session_id;
            let project_id = conversation.project_id;
            let revision = i64::try_from(conversation.revision)
                .map_err(|_| StoreError::InvalidRecord("revision exceeds i64".to_string()))?;
            let created_at = conversation.created_at.timestamp_millis();
            let updated_at = conversation.updated_at.timestamp_millis();
            let doc = serde_json::to_string(&conversation)?;

            match expected_revision {
                None => {
                    self.conn
                        .call(move |conn| {
                            conn.execute(
                                &format!(
                                    "INSERT OR REPLACE INTO {table}
                                    (session_id, project_id, revision, created_at, updated_at, doc)
                                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                                ),
                                rusqlite::params![
                                    session_id,
                                    project_id,
                                    revision,
                                    created_at,
                                    updated_at,
                                    doc
                                ],
                            )?;
                            Ok(())
                        })
                        .await?;
                    Ok(())
                }
                Some(expected) => {
                    let expected_column = i64::try_from(expected).map_err(|_| {
                        StoreError::InvalidRecord("revision exceeds i64".to_string())
                    })?;
                    let rows = self
                        .conn
                        .call(move |conn| {
                            let rows = conn.execute(
                                &format!(
                                    "UPDATE {table}
                                     SET project_id = ?1, revision = ?2, updated_at = ?3, doc = ?4
                                     WHERE session_id = ?5 AND revision = ?6"
                                ),
                                rusqlite::params![
                                    project_id,
                                    revision,
                                    updated_at,
                                    doc,
                                    session_id,
                                    expected_column
                                ],
                            )?;
                            Ok(rows)
                        })
                        .await?;

                    if rows == 0 {
                        return Err(StoreError::RevisionConflict {
                            session_id,
                            expected,
                        });
                    }
                    Ok(())
                }
            }
        })
    }

    fn conversations_for_project(
        &self,
        project_id: ProjectId,
    ) -> StoreFuture<'_, StoreResult<Vec<Conversation>>> {
        Box::pin(async move {
            let table = self.conversation_table.clone();
            let docs = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT doc FROM {table}
                         WHERE project_id = ?1
                         ORDER BY updated_at, session_id"
                    ))?;
                    let docs = stmt
                        .query_map(rusqlite::params![project_id], |row| {
                            row.get::<_, String>(0)
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(docs)
                })
                .await?;

            Self::decode_conversations(docs)
        })
    }

    fn all_conversations(&self) -> StoreFuture<'_, StoreResult<Vec<Conversation>>> {
        Box::pin(async move {
            let table = self.conversation_table.clone();
            let docs = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT doc FROM {table} ORDER BY updated_at, session_id"
                    ))?;
                    let docs = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(docs)
                })
                .await?;

            Self::decode_conversations(docs)
        })
    }

    fn get_session(
        &self,
        session_id: SessionId,
    ) -> StoreFuture<'_, StoreResult<Option<Session>>> {
        Box::pin(async move {
            let table = self.session_table.clone();
            let doc = self
                .conn
                .call(move |conn| {
                    let doc: Option<String> = conn
                        .query_row(
                            &format!("SELECT doc FROM {table} WHERE session_id = ?1"),
                            rusqlite::params![session_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(doc)
                })
                .await?;

            match doc {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn put_session(&self, session: Session) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let table = self.session_table.clone();
            let session_id = session.id;
            let project_id = session.project_id;
            let updated_at = session.updated_at.timestamp_millis();
            let doc = serde_json::to_string(&session)?;

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table}
                             (session_id, project_id, updated_at, doc)
                             VALUES (?1, ?2, ?3, ?4)"
                        ),
                        rusqlite::params![session_id, project_id, updated_at, doc],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn sessions_for_project(
        &self,
        project_id: ProjectId,
    ) -> StoreFuture<'_, StoreResult<Vec<Session>>> {
        Box::pin(async move {
            let table = self.session_table.clone();
            let docs = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT doc FROM {table}
                         WHERE project_id = ?1
                         ORDER BY updated_at, session_id"
                    ))?;
                    let docs = stmt
                        .query_map(rusqlite::params![project_id], |row| {
                            row.get::<_, String>(0)
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(docs)
                })
                .await?;

            let mut sessions = Vec::with_capacity(docs.len());
            for doc in docs {
                sessions.push(serde_json::from_str(&doc)?);
            }
            Ok(sessions)
        })
    }

    fn session_count(&self) -> StoreFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let table = self.session_table.clone();
            count_rows(&self.conn, table).await
        })
    }

    fn project_count(&self) -> StoreFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let table = self.project_table.clone();
            count_rows(&self.conn, table).await
        })
    }
}

async fn count_rows(conn: &Connection, table: String) -> StoreResult<usize> {
    let count = conn
        .call(move |conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            Ok(count)
        })
        .await?;
    usize::try_from(count).map_err(|_| StoreError::InvalidRecord("invalid row count".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::core::ids::ProjectId;
    use crate::core::message::{Message, MessageDraft};

    async fn open_backend(dir: &tempfile::TempDir) -> SqliteBackend {
        let config = StoreConfig {
            sqlite_path: dir.path().join("store.sqlite"),
            ..StoreConfig::default()
        };
        SqliteBackend::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_conversation_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir).await;

        let mut conversation = Conversation::new(SessionId::new(), ProjectId::new(), Utc::now());
        conversation.messages.push(Message::from_draft(
            conversation.session_id,
            MessageDraft::new("hello"),
            Utc::now(),
        ));
        backend
            .put_conversation(conversation.clone(), None)
            .await
            .unwrap();

        let loaded = backend
            .get_conversation(conversation.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, conversation);
    }

    #[tokio::test]
    async fn test_missing_conversation_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir).await;
        let loaded = backend.get_conversation(SessionId::new()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_revision_cas_rejects_stale_writer() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir).await;

        let conversation = Conversation::new(SessionId::new(), ProjectId::new(), Utc::now());
        let session_id = conversation.session_id;
        backend
            .put_conversation(conversation.clone(), None)
            .await
            .unwrap();

        // First writer wins.
        let mut first = conversation.clone();
        first.revision = 1;
        backend.put_conversation(first, Some(0)).await.unwrap();

        // Second writer raced on the same base revision.
        let mut second = conversation;
        second.revision = 1;
        let err = backend.put_conversation(second, Some(0)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::RevisionConflict { session_id: id, expected: 0 } if id == session_id
        ));
    }

    #[tokio::test]
    async fn test_project_filter_uses_matching_rows_only() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir).await;

        let project = ProjectId::new();
        let other = ProjectId::new();
        for project_id in [project, project, other] {
            let conversation = Conversation::new(SessionId::new(), project_id, Utc::now());
            backend.put_conversation(conversation, None).await.unwrap();
        }

        let matched = backend.conversations_for_project(project).await.unwrap();
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|c| c.project_id == project));
        assert_eq!(backend.all_conversations().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir).await;

        let project = ProjectId::new();
        let session = Session::new(SessionId::new(), project, None, Utc::now());
        backend.put_session(session.clone()).await.unwrap();

        let loaded = backend.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(backend.session_count().await.unwrap(), 1);
        assert_eq!(backend.project_count().await.unwrap(), 0);

        let by_project = backend.sessions_for_project(project).await.unwrap();
        assert_eq!(by_project, vec![session]);
    }
}
