//! Agent category labels.
//!
//! The upstream orchestrator runs one specialist agent per software
//! lifecycle stage; messages and artifacts carry the role of the agent that
//! produced them. The set uses stable `snake_case` identifiers for storage,
//! with a forward-compatible `Unknown` bucket for roles added later.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The category of the agent that produced a message or artifact.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AgentRole {
    /// Product requirements and specification work.
    ProductManager,
    /// Business analysis and functional requirements.
    BusinessAnalyst,
    /// Architecture and implementation.
    SoftwareDeveloper,
    /// Test strategy and quality assurance.
    QaEngineer,
    /// Deployment pipelines and infrastructure.
    DevopsEngineer,
    /// Forward-compatibility bucket for unrecognized roles.
    #[serde(other)]
    Unknown,
}

impl AgentRole {
    /// All known roles (excluding `Unknown`).
    pub const ALL: &'static [Self] = &[
        Self::ProductManager,
        Self::BusinessAnalyst,
        Self::SoftwareDeveloper,
        Self::QaEngineer,
        Self::DevopsEngineer,
    ];

    /// Stable storage identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductManager => "product_manager",
            Self::BusinessAnalyst => "business_analyst",
            Self::SoftwareDeveloper => "software_developer",
            Self::QaEngineer => "qa_engineer",
            Self::DevopsEngineer => "devops_engineer",
            Self::Unknown => "unknown",
        }
    }

    /// Lossy parsing: returns `Unknown` instead of failing.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        Self::from_str(s).unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse error for [`AgentRole`].
#[derive(Debug, Clone)]
pub struct AgentRoleParseError {
    value: String,
}

impl AgentRoleParseError {
    /// The raw value that failed parsing.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for AgentRoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid agent role: {}", self.value)
    }
}

impl std::error::Error for AgentRoleParseError {}

impl FromStr for AgentRole {
    type Err = AgentRoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();

        // Short aliases used by upstream callers.
        if raw.eq_ignore_ascii_case("pm") {
            return Ok(Self::ProductManager);
        }
        if raw.eq_ignore_ascii_case("ba") {
            return Ok(Self::BusinessAnalyst);
        }
        if raw.eq_ignore_ascii_case("dev") || raw.eq_ignore_ascii_case("developer") {
            return Ok(Self::SoftwareDeveloper);
        }
        if raw.eq_ignore_ascii_case("qa") {
            return Ok(Self::QaEngineer);
        }
        if raw.eq_ignore_ascii_case("devops") {
            return Ok(Self::DevopsEngineer);
        }

        for role in Self::ALL {
            if raw.eq_ignore_ascii_case(role.as_str()) {
                return Ok(*role);
            }
        }

        Err(AgentRoleParseError {
            value: raw.to_string(),
        })
    }
}
