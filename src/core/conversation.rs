//! The conversation record: message history plus project context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::context::ProjectContext;
use crate::core::ids::{ProjectId, SessionId};
use crate::core::message::Message;

/// The message history and project context tied one-to-one to a session.
///
/// The whole record is rewritten on every mutation; `revision` is the
/// optimistic-versioning counter backends compare-and-swap on, so an
/// overlapping read-modify-write surfaces a conflict instead of silently
/// discarding the first writer's append.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Session this conversation belongs to.
    pub session_id: SessionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Append-only message sequence, in arrival order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Mergeable project knowledge and artifacts.
    #[serde(default)]
    pub project_context: ProjectContext,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-versioning counter, bumped on every mutation.
    #[serde(default)]
    pub revision: u64,
}

impl Conversation {
    /// Create an empty conversation for a freshly created session.
    #[must_use]
    pub fn new(session_id: SessionId, project_id: ProjectId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            project_id,
            messages: Vec::new(),
            project_context: ProjectContext::default(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Number of messages in the sequence.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Number of artifacts in the project context.
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.project_context.artifacts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_is_empty() {
        let conversation = Conversation::new(SessionId::new(), ProjectId::new(), Utc::now());
        assert_eq!(conversation.message_count(), 0);
        assert_eq!(conversation.artifact_count(), 0);
        assert_eq!(conversation.revision, 0);
    }

    #[test]
    fn test_conversation_serde_roundtrip() {
        let conversation = Conversation::new(SessionId::new(), ProjectId::new(), Utc::now());
        let json = serde_json::to_string(&conversation).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(conversation, back);
    }
}
