//! Provider grouping and per-provider rate-limit state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Look up the upstream API provider an agent's quota is shared under.
///
/// The mapping is a small static table; unknown names map to themselves
/// (conservative isolation — an unrecognised agent never shares a quota
/// with anything else).
pub fn provider_for(agent_name: &str) -> String {
    match agent_name {
        "claude" | "claude-code" => "anthropic".to_string(),
        "codex" | "codex-cli" => "openai".to_string(),
        "gemini" | "gemini-cli" => "google".to_string(),
        other => other.to_string(),
    }
}

/// Point-in-time rate-limit state for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderState {
    /// The provider this state describes.
    pub provider: String,
    /// Whether the provider is currently considered limited.
    pub is_limited: bool,
    /// Wall-clock time at which the limit is expected to clear.
    pub reset_at: DateTime<Utc>,
    /// The duration most recently reported by an agent (for display only;
    /// `reset_at` is authoritative for blocking decisions).
    #[serde(with = "duration_secs_opt")]
    pub reset_after: Option<Duration>,
    /// Monotonic count of `RecordRateLimit` calls for this provider's
    /// lifetime. Never reset by `ClearRateLimit`.
    pub wait_count: u32,
    /// The most recent rate-limit message text observed, if any.
    pub last_message: Option<String>,
    /// Wall-clock time of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl ProviderState {
    /// A fresh, not-limited state for `provider`, as of `now`.
    pub fn new(provider: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            provider: provider.into(),
            is_limited: false,
            reset_at: now,
            reset_after: None,
            wait_count: 0,
            last_message: None,
            updated_at: now,
        }
    }

    /// A state with `is_limited=false` OR `reset_at <= now` is not
    /// blocking.
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        self.is_limited && self.reset_at > now
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        d: &Option<Duration>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<Duration>, D::Error> {
        let secs: Option<f64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}
