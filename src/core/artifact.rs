//! Generated artifact records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::ArtifactId;
use crate::core::roles::AgentRole;

/// The kind of content an artifact holds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ArtifactKind {
    /// Source code.
    Code,
    /// Prose documentation.
    Document,
    /// Configuration content.
    Config,
    /// Forward-compatibility bucket for unrecognized kinds.
    #[serde(other)]
    Unknown,
}

impl ArtifactKind {
    /// Stable storage identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Document => "document",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated output attached to a conversation's project context.
///
/// Immutable once created; artifacts are only ever appended, never edited or
/// removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique artifact identifier.
    pub id: ArtifactId,
    /// What kind of content this is.
    pub kind: ArtifactKind,
    /// Display name.
    pub name: String,
    /// Content payload.
    pub content: String,
    /// Language tag for code artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Intended file path, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Role of the agent that produced the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Construct the stored artifact from a caller-supplied draft.
    #[must_use]
    pub fn from_draft(draft: ArtifactDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: ArtifactId::new(),
            kind: draft.kind,
            name: draft.name,
            content: draft.content,
            language: draft.language,
            path: draft.path,
            agent_role: draft.agent_role,
            created_at: now,
        }
    }
}

/// Caller-supplied fields for a new artifact.
///
/// The store assigns the identifier and timestamp on append.
#[derive(Clone, Debug)]
pub struct ArtifactDraft {
    /// What kind of content this is.
    pub kind: ArtifactKind,
    /// Display name.
    pub name: String,
    /// Content payload.
    pub content: String,
    /// Language tag for code artifacts.
    pub language: Option<String>,
    /// Intended file path, if any.
    pub path: Option<String>,
    /// Role of the agent that produced the artifact.
    pub agent_role: Option<AgentRole>,
}

impl ArtifactDraft {
    /// Create a draft with the required fields.
    #[must_use]
    pub fn new(kind: ArtifactKind, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            content: content.into(),
            language: None,
            path: None,
            agent_role: None,
        }
    }

    /// Attach a language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Attach an intended file path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the producing agent's role.
    #[must_use]
    pub const fn with_agent_role(mut self, role: AgentRole) -> Self {
        self.agent_role = Some(role);
        self
    }
}
