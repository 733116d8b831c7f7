//! Core record types, identifiers, configuration, and errors.

pub mod artifact;
pub mod config;
pub mod context;
pub mod conversation;
pub mod errors;
pub mod ids;
pub mod message;
pub mod roles;
pub mod session;

pub use artifact::{Artifact, ArtifactDraft, ArtifactKind};
pub use config::StoreConfig;
pub use context::{ContextEntry, ContextKind, ContextKindParseError, ProjectContext};
pub use conversation::Conversation;
pub use errors::{StoreError, StoreResult};
pub use ids::{ArtifactId, MessageId, ProjectId, SessionId};
pub use message::{Message, MessageDraft, MessageKind};
pub use roles::{AgentRole, AgentRoleParseError};
pub use session::{Project, Session};
