//! Agent identity and static configuration.

use crate::{AgentPipeError, Result};
use serde::{Deserialize, Serialize};

/// A validated agent name.
///
/// Must match `^[A-Za-z0-9][A-Za-z0-9-]*$`: lowercase-alphanumeric-plus-
/// hyphen in spirit, but validation accepts any case since the registry
/// keys on the string as given.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentIdentity(String);

impl AgentIdentity {
    /// Validate and construct an identity from a raw name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(AgentPipeError::InvalidName(name));
        }
        Ok(Self(name))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::borrow::Borrow<str> for AgentIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphanumeric() {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Static, per-agent configuration supplied by the host application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Executable name or path; falls back to a variant-specific default
    /// binary name when unset.
    #[serde(default)]
    pub command: Option<String>,

    /// Model identifier passed through to the agent CLI.
    #[serde(default)]
    pub model: Option<String>,

    /// Reasoning-effort level, forwarded as `CLAUDE_CODE_EFFORT_LEVEL` for
    /// variants that support it.
    #[serde(default)]
    pub effort: Option<String>,

    /// Prompt template; interpolation is the caller's responsibility.
    #[serde(default)]
    pub prompt_template: Option<String>,

    /// Tool allow-list forwarded to `--allowedTools` (Claude-style only).
    #[serde(default)]
    pub allowed_tools: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_and_hyphen() {
        assert!(AgentIdentity::new("claude-3").is_ok());
        assert!(AgentIdentity::new("codex").is_ok());
        assert!(AgentIdentity::new("A1-b2").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(AgentIdentity::new("").is_err());
    }

    #[test]
    fn rejects_leading_hyphen() {
        assert!(AgentIdentity::new("-claude").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(AgentIdentity::new("claude_3").is_err());
        assert!(AgentIdentity::new("claude 3").is_err());
        assert!(AgentIdentity::new("claude!").is_err());
    }

    #[test]
    fn display_roundtrips_the_name() {
        let id = AgentIdentity::new("claude").unwrap();
        assert_eq!(id.to_string(), "claude");
        assert_eq!(id.as_str(), "claude");
    }
}
