//! Configuration for the conversation store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{StoreError, StoreResult};

/// Top-level configuration for the conversation store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path for the durable backend.
    pub sqlite_path: PathBuf,
    /// Snapshot file path for the flat fallback backend.
    pub snapshot_path: PathBuf,
    /// Conversation table name.
    pub conversation_table: String,
    /// Session table name.
    pub session_table: String,
    /// Project table name.
    pub project_table: String,
    /// Default number of trailing messages in a conversation context summary.
    pub context_message_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("conversations.sqlite"),
            snapshot_path: PathBuf::from("conversations.snapshot.json"),
            conversation_table: "conversations".to_string(),
            session_table: "sessions".to_string(),
            project_table: "projects".to_string(),
            context_message_limit: 20,
        }
    }
}

impl StoreConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> StoreResult<()> {
        if self.context_message_limit == 0 {
            return Err(StoreError::InvalidConfig(
                "context_message_limit must be > 0".to_string(),
            ));
        }

        for (field, table) in [
            ("conversation_table", &self.conversation_table),
            ("session_table", &self.session_table),
            ("project_table", &self.project_table),
        ] {
            validate_table_name(field, table)?;
        }

        Ok(())
    }
}

/// Table names are interpolated into DDL, so only identifier characters pass.
fn validate_table_name(field: &str, table: &str) -> StoreResult<()> {
    if table.is_empty() {
        return Err(StoreError::InvalidConfig(format!(
            "{field} must not be empty"
        )));
    }

    let mut chars = table.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidConfig(format!(
            "{field} must be an ASCII identifier, got {table:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_context_limit_rejected() {
        let config = StoreConfig {
            context_message_limit: 0,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_table_name_rejected() {
        let config = StoreConfig {
            conversation_table: "conversations; DROP TABLE x".to_string(),
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            session_table: String::new(),
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
