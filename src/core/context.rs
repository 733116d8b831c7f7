//! Mergeable project context attached to a conversation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::artifact::Artifact;

/// The fixed set of project knowledge categories.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Product requirements.
    Requirements,
    /// System architecture.
    Architecture,
    /// Codebase knowledge.
    Codebase,
    /// Compliance constraints.
    Compliance,
}

impl ContextKind {
    /// All context kinds.
    pub const ALL: &'static [Self] = &[
        Self::Requirements,
        Self::Architecture,
        Self::Codebase,
        Self::Compliance,
    ];

    /// Stable storage identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Architecture => "architecture",
            Self::Codebase => "codebase",
            Self::Compliance => "compliance",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse error for [`ContextKind`].
#[derive(Debug, Clone)]
pub struct ContextKindParseError {
    value: String,
}

impl ContextKindParseError {
    /// The raw value that failed parsing.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ContextKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid context kind: {}", self.value)
    }
}

impl std::error::Error for ContextKindParseError {}

impl FromStr for ContextKind {
    type Err = ContextKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        for kind in Self::ALL {
            if raw.eq_ignore_ascii_case(kind.as_str()) {
                return Ok(*kind);
            }
        }
        Err(ContextKindParseError {
            value: raw.to_string(),
        })
    }
}

/// One mergeable context blob with its update stamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Free-form context data.
    pub data: Map<String, Value>,
    /// Last update time for this entry.
    pub updated_at: DateTime<Utc>,
}

impl ContextEntry {
    /// Shallow-merge `data` into the entry.
    ///
    /// Later keys overwrite earlier ones at the top level only; nested
    /// objects are replaced wholesale, not recursively merged.
    pub fn merge(&mut self, data: Map<String, Value>, now: DateTime<Utc>) {
        for (key, value) in data {
            self.data.insert(key, value);
        }
        self.updated_at = now;
    }
}

/// Structured project knowledge scoped to one conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Mergeable context blobs, keyed by category.
    #[serde(default)]
    pub entries: HashMap<ContextKind, ContextEntry>,
    /// Append-only list of generated artifacts.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl ProjectContext {
    /// Shallow-merge `data` into the entry for `kind`, creating it if absent.
    ///
    /// Returns the merged entry.
    pub fn merge_entry(
        &mut self,
        kind: ContextKind,
        data: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> &ContextEntry {
        let entry = self.entries.entry(kind).or_insert_with(|| ContextEntry {
            data: Map::new(),
            updated_at: now,
        });
        entry.merge(data, now);
        entry
    }

    /// Look up the entry for a context kind.
    #[must_use]
    pub fn entry(&self, kind: ContextKind) -> Option<&ContextEntry> {
        self.entries.get(&kind)
    }

    /// Append a generated artifact.
    pub fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }
}
