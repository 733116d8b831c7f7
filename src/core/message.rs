//! Conversation message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::artifact::Artifact;
use crate::core::ids::{MessageId, SessionId};
use crate::core::roles::AgentRole;

/// Who authored a message.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Typed by the user.
    #[default]
    User,
    /// Produced by an agent.
    Agent,
    /// Emitted by the system itself.
    System,
}

impl MessageKind {
    /// Stable storage identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message in a conversation's append-only sequence.
///
/// Immutable once created. Messages are never reordered or removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Who authored the message.
    pub kind: MessageKind,
    /// Role of the producing agent, when `kind` is [`MessageKind::Agent`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// Textual content.
    pub content: String,
    /// Artifacts referenced by this message.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Construct the stored message from a caller-supplied draft.
    #[must_use]
    pub fn from_draft(session_id: SessionId, draft: MessageDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            kind: draft.kind,
            agent_role: draft.agent_role,
            content: draft.content,
            artifacts: draft.artifacts,
            metadata: draft.metadata,
            created_at: now,
        }
    }
}

/// Caller-supplied fields for a new message.
///
/// Kind defaults to [`MessageKind::User`] and the agent role to none; the
/// store assigns the identifier and timestamp on append.
#[derive(Clone, Debug)]
pub struct MessageDraft {
    /// Who authored the message.
    pub kind: MessageKind,
    /// Role of the producing agent.
    pub agent_role: Option<AgentRole>,
    /// Textual content.
    pub content: String,
    /// Artifacts referenced by the message.
    pub artifacts: Vec<Artifact>,
    /// Free-form metadata.
    pub metadata: Map<String, Value>,
}

impl MessageDraft {
    /// Create a user message draft.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::User,
            agent_role: None,
            content: content.into(),
            artifacts: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Override the message kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Label the message with the producing agent's role.
    ///
    /// Also switches the kind to [`MessageKind::Agent`].
    #[must_use]
    pub const fn with_agent_role(mut self, role: AgentRole) -> Self {
        self.kind = MessageKind::Agent;
        self.agent_role = Some(role);
        self
    }

    /// Attach referenced artifacts.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Attach free-form metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
