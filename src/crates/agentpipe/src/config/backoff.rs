//! Backoff configuration for the rate-limit coordinator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for [`crate::ratelimit::RateLimitCoordinator`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Wait used when a rate-limit finding carries no reset duration.
    #[serde(with = "duration_millis")]
    pub default_wait: Duration,

    /// Ceiling on `wait_count` before a provider is treated as
    /// unrecoverable for the remainder of the run. `0` means "never wait".
    pub max_waits: u32,

    /// Fraction of `base` added as uniform random jitter, in `[0, 1]`.
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            default_wait: Duration::from_secs(30),
            max_waits: 5,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    /// `base = info.reset_after` when positive, else `default_wait`; add
    /// uniform jitter in `[0, jitter_factor * base)` when `jitter_factor > 0`.
    pub fn compute_wait(&self, reset_after: Option<Duration>) -> Duration {
        let base = match reset_after {
            Some(d) if d > Duration::ZERO => d,
            _ => self.default_wait,
        };

        if self.jitter_factor <= 0.0 {
            return base;
        }

        let jitter_max = base.as_secs_f64() * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = rand::random::<f64>() * jitter_max;
        base + Duration::from_secs_f64(jitter)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
