//! Session and project records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ids::{ProjectId, SessionId};

/// A top-level record identifying one user interaction period.
///
/// Stored independently of its [`crate::core::Conversation`]; the two share
/// the session identifier as a foreign key with no cascade semantics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last refresh timestamp.
    pub updated_at: DateTime<Utc>,
    /// Whether the session is considered active.
    pub active: bool,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Session {
    /// Create a new active session.
    #[must_use]
    pub fn new(
        id: SessionId,
        project_id: ProjectId,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            name: name.unwrap_or_else(|| "New session".to_string()),
            created_at: now,
            updated_at: now,
            active: true,
            metadata: Map::new(),
        }
    }

    /// Refresh the update timestamp.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// A project record.
///
/// Declared and stored for forward compatibility; no operation currently
/// creates or reads one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
