//! The conversation store facade.
//!
//! One uniform, backend-routed interface for persisting sessions,
//! conversations, project context, and artifacts. The store is an
//! explicitly constructed component: build one with [`ConversationStore::open`]
//! and pass it to whatever layer needs persistence.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::backend::{BackendKind, ConversationBackend, select_backend};
use crate::core::artifact::{Artifact, ArtifactDraft};
use crate::core::config::StoreConfig;
use crate::core::context::{ContextEntry, ContextKind, ProjectContext};
use crate::core::conversation::Conversation;
use crate::core::errors::{StoreError, StoreResult};
use crate::core::ids::{ProjectId, SessionId};
use crate::core::message::{Message, MessageDraft};
use crate::core::session::Session;
use crate::search::{SearchHit, search_messages};

/// Summary view of a conversation: trailing messages plus full context.
#[derive(Clone, Debug)]
pub struct ConversationContext {
    /// Session the summary describes.
    pub session_id: SessionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// The trailing messages, in original order.
    pub messages: Vec<Message>,
    /// The full project context.
    pub project_context: ProjectContext,
    /// Total message count of the conversation.
    pub total_messages: usize,
}

/// Aggregate counts across the store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StoreStats {
    /// Number of conversations.
    pub conversations: usize,
    /// Number of messages across all conversations.
    pub messages: usize,
    /// Number of artifacts across all project contexts.
    pub artifacts: usize,
    /// Number of sessions.
    pub sessions: usize,
    /// Number of projects.
    pub projects: usize,
}

/// Durable storage and retrieval for conversational sessions.
pub struct ConversationStore {
    config: StoreConfig,
    backend: Arc<dyn ConversationBackend>,
}

impl ConversationStore {
    /// Open a store, selecting the backend once.
    ///
    /// Prefers the `SQLite` backend; if it cannot be opened the store
    /// silently demotes to the flat snapshot fallback.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the fallback
    /// backend cannot be constructed.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let backend = select_backend(&config).await?;
        Ok(Self { config, backend })
    }

    /// Build a store over an explicit backend (dependency injection).
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn with_backend(
        config: StoreConfig,
        backend: Arc<dyn ConversationBackend>,
    ) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    /// Which backend the one-time startup selection chose.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Create a session and its empty conversation, returning the session id.
    ///
    /// Generates a project id when none is supplied. The two records are
    /// persisted as independent writes with no cross-record atomicity, and
    /// no uniqueness check is made: an id collision silently overwrites.
    ///
    /// # Errors
    /// Returns an error if either write fails.
    pub async fn create_session(
        &self,
        project_id: Option<ProjectId>,
        name: Option<String>,
    ) -> StoreResult<SessionId> {
        let session_id = SessionId::new();
        let project_id = project_id.unwrap_or_else(ProjectId::new);
        let now = Utc::now();

        let session = Session::new(session_id, project_id, name, now);
        let conversation = Conversation::new(session_id, project_id, now);

        self.backend.put_session(session).await?;
        self.backend.put_conversation(conversation, None).await?;

        info!("created session {session_id} in project {project_id}");
        Ok(session_id)
    }

    /// Get a session record.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<Session>> {
        self.backend.get_session(session_id).await
    }

    /// Refresh a session's update timestamp.
    ///
    /// # Errors
    /// Returns [`StoreError::SessionNotFound`] if the session does not
    /// exist, or an error if storage access fails.
    pub async fn touch_session(&self, session_id: SessionId) -> StoreResult<Session> {
        let mut session = self
            .backend
            .get_session(session_id)
            .await?
            .ok_or(StoreError::SessionNotFound(session_id))?;
        session.touch(Utc::now());
        self.backend.put_session(session.clone()).await?;
        Ok(session)
    }

    /// All sessions belonging to a project.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn project_sessions(&self, project_id: ProjectId) -> StoreResult<Vec<Session>> {
        self.backend.sessions_for_project(project_id).await
    }

    /// Append a message to a session's conversation.
    ///
    /// Constructs the stored message from the draft, refreshes the
    /// conversation timestamp, and rewrites the full record. Returns the
    /// constructed message.
    ///
    /// # Errors
    /// Returns [`StoreError::SessionNotFound`] if the conversation does not
    /// exist (no write is performed), [`StoreError::RevisionConflict`] if a
    /// concurrent writer got there first, or an error if storage fails.
    pub async fn add_message(
        &self,
        session_id: SessionId,
        draft: MessageDraft,
    ) -> StoreResult<Message> {
        let mut conversation = self.load_conversation(session_id).await?;
        let message = Message::from_draft(session_id, draft, Utc::now());

        conversation.messages.push(message.clone());
        self.commit(conversation).await?;

        debug!("appended message {} to session {session_id}", message.id);
        Ok(message)
    }

    /// Shallow-merge data into one project context entry.
    ///
    /// Later keys overwrite earlier ones at the top level only; nested
    /// objects are replaced wholesale. Returns the merged entry.
    ///
    /// # Errors
    /// Returns [`StoreError::SessionNotFound`] if the conversation does not
    /// exist, [`StoreError::RevisionConflict`] on a concurrent update, or an
    /// error if storage fails.
    pub async fn update_project_context(
        &self,
        session_id: SessionId,
        kind: ContextKind,
        data: Map<String, Value>,
    ) -> StoreResult<ContextEntry> {
        let mut conversation = self.load_conversation(session_id).await?;
        let now = Utc::now();

        let entry = conversation
            .project_context
            .merge_entry(kind, data, now)
            .clone();
        self.commit(conversation).await?;

        debug!("merged {kind} context for session {session_id}");
        Ok(entry)
    }

    /// Append an artifact to a session's project context.
    ///
    /// # Errors
    /// Returns [`StoreError::SessionNotFound`] if the conversation does not
    /// exist, [`StoreError::RevisionConflict`] on a concurrent update, or an
    /// error if storage fails.
    pub async fn add_artifact(
        &self,
        session_id: SessionId,
        draft: ArtifactDraft,
    ) -> StoreResult<Artifact> {
        let mut conversation = self.load_conversation(session_id).await?;
        let artifact = Artifact::from_draft(draft, Utc::now());

        conversation
            .project_context
            .push_artifact(artifact.clone());
        self.commit(conversation).await?;

        debug!("added artifact {} to session {session_id}", artifact.id);
        Ok(artifact)
    }

    /// Get a conversation by session id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn get_conversation(
        &self,
        session_id: SessionId,
    ) -> StoreResult<Option<Conversation>> {
        self.backend.get_conversation(session_id).await
    }

    /// All conversations belonging to a project.
    ///
    /// Index-assisted on the durable backend, a linear scan on the fallback.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn project_conversations(
        &self,
        project_id: ProjectId,
    ) -> StoreResult<Vec<Conversation>> {
        self.backend.conversations_for_project(project_id).await
    }

    /// Summarize a conversation: the last `message_limit` messages in
    /// original order, the full project context, and the total count.
    ///
    /// A limit larger than the sequence returns every message; zero returns
    /// none. Returns `None` when the conversation does not exist.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn conversation_context(
        &self,
        session_id: SessionId,
        message_limit: usize,
    ) -> StoreResult<Option<ConversationContext>> {
        let Some(conversation) = self.backend.get_conversation(session_id).await? else {
            return Ok(None);
        };

        let total_messages = conversation.messages.len();
        let start = total_messages.saturating_sub(message_limit);
        let messages = conversation.messages[start..].to_vec();

        Ok(Some(ConversationContext {
            session_id: conversation.session_id,
            project_id: conversation.project_id,
            messages,
            project_context: conversation.project_context,
            total_messages,
        }))
    }

    /// Summarize a conversation with the configured default message limit.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn recent_context(
        &self,
        session_id: SessionId,
    ) -> StoreResult<Option<ConversationContext>> {
        self.conversation_context(session_id, self.config.context_message_limit)
            .await
    }

    /// Search message content across conversations, best hits first.
    ///
    /// Case-insensitive substring match over every message, optionally
    /// restricted to one project, via full materialization and a linear
    /// scan. No index is used even on the durable backend.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn search_conversations(
        &self,
        query: &str,
        project_id: Option<ProjectId>,
    ) -> StoreResult<Vec<SearchHit>> {
        let conversations = match project_id {
            Some(project_id) => self.backend.conversations_for_project(project_id).await?,
            None => self.backend.all_conversations().await?,
        };

        Ok(search_messages(&conversations, query))
    }

    /// Aggregate counts across the store.
    ///
    /// All counts come from the active backend, including session and
    /// project totals.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn stats(&self) -> StoreResult<StoreStats> {
        let conversations = self.backend.all_conversations().await?;
        let messages = conversations.iter().map(Conversation::message_count).sum();
        let artifacts = conversations
            .iter()
            .map(Conversation::artifact_count)
            .sum();

        Ok(StoreStats {
            conversations: conversations.len(),
            messages,
            artifacts,
            sessions: self.backend.session_count().await?,
            projects: self.backend.project_count().await?,
        })
    }

    async fn load_conversation(&self, session_id: SessionId) -> StoreResult<Conversation> {
        self.backend
            .get_conversation(session_id)
            .await?
            .ok_or(StoreError::SessionNotFound(session_id))
    }

    /// Persist a mutated conversation with an optimistic revision check.
    async fn commit(&self, mut conversation: Conversation) -> StoreResult<()> {
        let expected = conversation.revision;
        conversation.revision += 1;
        conversation.updated_at = Utc::now();
        self.backend
            .put_conversation(conversation, Some(expected))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::backend::{SnapshotBackend, SqliteBackend};
    use crate::core::artifact::ArtifactKind;
    use crate::core::message::MessageKind;
    use crate::core::roles::AgentRole;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn snapshot_store(dir: &tempfile::TempDir) -> ConversationStore {
        let config = StoreConfig {
            snapshot_path: dir.path().join("snapshot.json"),
            ..StoreConfig::default()
        };
        let backend = Arc::new(SnapshotBackend::open(&config).await);
        ConversationStore::with_backend(config, backend).unwrap()
    }

    async fn sqlite_store(dir: &tempfile::TempDir) -> ConversationStore {
        let config = StoreConfig {
            sqlite_path: dir.path().join("store.sqlite"),
            ..StoreConfig::default()
        };
        let backend = Arc::new(SqliteBackend::open(&config).await.unwrap());
        ConversationStore::with_backend(config, backend).unwrap()
    }

    async fn check_create_session_yields_empty_conversation(store: &ConversationStore) {
        let project_id = ProjectId::new();
        let session_id = store
            .create_session(Some(project_id), Some("kickoff".to_string()))
            .await
            .unwrap();

        let conversation = store.get_conversation(session_id).await.unwrap().unwrap();
        assert_eq!(conversation.session_id, session_id);
        assert_eq!(conversation.project_id, project_id);
        assert!(conversation.messages.is_empty());

        let session = store.get_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.project_id, project_id);
        assert_eq!(session.name, "kickoff");
    }

    #[tokio::test]
    async fn test_create_session_yields_empty_conversation() {
        let dir = tempfile::tempdir().unwrap();
        check_create_session_yields_empty_conversation(&snapshot_store(&dir).await).await;

        let dir = tempfile::tempdir().unwrap();
        check_create_session_yields_empty_conversation(&sqlite_store(&dir).await).await;
    }

    #[tokio::test]
    async fn test_messages_keep_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = snapshot_store(&dir).await;
        let session_id = store.create_session(None, None).await.unwrap();

        for i in 0..5 {
            store
                .add_message(session_id, MessageDraft::new(format!("message {i}")))
                .await
                .unwrap();
        }

        let conversation = store.get_conversation(session_id).await.unwrap().unwrap();
        assert_eq!(conversation.message_count(), 5);
        for (i, message) in conversation.messages.iter().enumerate() {
            assert_eq!(message.content, format!("message {i}"));
            assert_eq!(message.kind, MessageKind::User);
        }
    }

    #[tokio::test]
    async fn test_add_message_to_missing_session_fails_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = snapshot_store(&dir).await;
        let missing = SessionId::new();

        let err = store
            .add_message(missing, MessageDraft::new("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(id) if id == missing));

        assert!(store.get_conversation(missing).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
    }

    #[tokio::test]
    async fn test_context_merge_is_additive() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        let session_id = store.create_session(None, None).await.unwrap();

        store
            .update_project_context(session_id, ContextKind::Requirements, object(json!({"a": 1})))
            .await
            .unwrap();
        let entry = store
            .update_project_context(session_id, ContextKind::Requirements, object(json!({"b": 2})))
            .await
            .unwrap();

        assert_eq!(entry.data.get("a"), Some(&json!(1)));
        assert_eq!(entry.data.get("b"), Some(&json!(2)));

        let conversation = store.get_conversation(session_id).await.unwrap().unwrap();
        let stored = conversation
            .project_context
            .entry(ContextKind::Requirements)
            .unwrap();
        assert_eq!(stored.data.get("a"), Some(&json!(1)));
        assert_eq!(stored.data.get("b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_conversation_context_trailing_slice() {
        let dir = tempfile::tempdir().unwrap();
        let store = snapshot_store(&dir).await;
        let session_id = store.create_session(None, None).await.unwrap();

        for i in 0..5 {
            store
                .add_message(session_id, MessageDraft::new(format!("m{i}")))
                .await
                .unwrap();
        }

        let context = store
            .conversation_context(session_id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(context.total_messages, 5);
        assert_eq!(context.messages.len(), 2);
        assert_eq!(context.messages[0].content, "m3");
        assert_eq!(context.messages[1].content, "m4");

        // Oversized limit returns the whole sequence.
        let context = store
            .conversation_context(session_id, 100)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(context.messages.len(), 5);

        assert!(store
            .conversation_context(SessionId::new(), 2)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_search_scores_and_project_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = snapshot_store(&dir).await;

        let project = ProjectId::new();
        let in_project = store.create_session(Some(project), None).await.unwrap();
        let elsewhere = store.create_session(None, None).await.unwrap();

        store
            .add_message(in_project, MessageDraft::new("hello world"))
            .await
            .unwrap();
        store
            .add_message(elsewhere, MessageDraft::new("hello again"))
            .await
            .unwrap();

        let hits = store.search_conversations("hello", None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.relevance == 10));

        let hits = store
            .search_conversations("hello", Some(project))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id, in_project);
        assert_eq!(hits[0].message.content, "hello world");
    }

    #[tokio::test]
    async fn test_stats_aggregate_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;

        let first = store.create_session(None, None).await.unwrap();
        let second = store.create_session(None, None).await.unwrap();

        store
            .add_message(first, MessageDraft::new("one"))
            .await
            .unwrap();
        store
            .add_message(first, MessageDraft::new("two"))
            .await
            .unwrap();
        store
            .add_message(
                second,
                MessageDraft::new("report ready").with_agent_role(AgentRole::QaEngineer),
            )
            .await
            .unwrap();
        store
            .add_artifact(
                second,
                ArtifactDraft::new(ArtifactKind::Document, "test plan", "..."),
            )
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.conversations, 2);
        assert_eq!(stats.messages, 3);
        assert_eq!(stats.artifacts, 1);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.projects, 0);
    }

    #[tokio::test]
    async fn test_touch_session_refreshes_timestamp_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = snapshot_store(&dir).await;
        let session_id = store.create_session(None, None).await.unwrap();

        let before = store.get_session(session_id).await.unwrap().unwrap();
        let touched = store.touch_session(session_id).await.unwrap();

        assert_eq!(touched.created_at, before.created_at);
        assert!(touched.updated_at >= before.updated_at);
        assert_eq!(touched.name, before.name);

        let err = store.touch_session(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_project_sessions_lists_only_matching() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;

        let project = ProjectId::new();
        let a = store.create_session(Some(project), None).await.unwrap();
        let b = store.create_session(Some(project), None).await.unwrap();
        store.create_session(None, None).await.unwrap();

        let sessions = store.project_sessions(project).await.unwrap();
        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(sessions.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }

    #[tokio::test]
    async fn test_artifact_appends_to_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = snapshot_store(&dir).await;
        let session_id = store.create_session(None, None).await.unwrap();

        let artifact = store
            .add_artifact(
                session_id,
                ArtifactDraft::new(ArtifactKind::Code, "handler", "fn handle() {}")
                    .with_language("rust")
                    .with_agent_role(AgentRole::SoftwareDeveloper),
            )
            .await
            .unwrap();

        let conversation = store.get_conversation(session_id).await.unwrap().unwrap();
        assert_eq!(conversation.project_context.artifacts, vec![artifact]);
    }
}
