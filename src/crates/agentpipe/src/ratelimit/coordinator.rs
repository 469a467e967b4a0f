//! Cross-provider rate-limit coordination.

use super::provider::{provider_for, ProviderState};
use crate::agent::RateLimitInfo;
use crate::cancel::CancelToken;
use crate::config::BackoffConfig;
use crate::{AgentPipeError, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

type UpdateCallback = dyn Fn(&ProviderState) + Send + Sync;

/// Process-wide, concurrency-safe coordinator of rate-limit state, grouped
/// by [`provider_for`]. Long-lived: created once by the pipeline host and
/// shared by every [`crate::agent::Agent`] consumer.
#[derive(Clone)]
pub struct RateLimitCoordinator {
    states: Arc<RwLock<HashMap<String, ProviderState>>>,
    backoff: BackoffConfig,
    callback: Arc<RwLock<Option<Arc<UpdateCallback>>>>,
}

impl RateLimitCoordinator {
    /// Create a coordinator with the given backoff tunables.
    pub fn new(backoff: BackoffConfig) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            backoff,
            callback: Arc::new(RwLock::new(None)),
        }
    }

    /// Install (or, with `None`, clear) the update callback. The callback
    /// is invoked outside the internal lock, never while it is held.
    pub fn set_update_callback(
        &self,
        callback: Option<Arc<dyn Fn(&ProviderState) + Send + Sync>>,
    ) {
        *self.callback.write() = callback;
    }

    /// Record a rate-limit finding for `agent_name`'s provider.
    ///
    /// Upserts the provider's state: sets `is_limited = true`, increments
    /// `wait_count`, extends `reset_at` to `max(current, now + wait)`
    /// (never shortens it), and updates `last_message` when `info` carries
    /// one. Fires the update callback after the lock is released.
    pub fn record_rate_limit(
        &self,
        agent_name: &str,
        info: Option<&RateLimitInfo>,
    ) -> ProviderState {
        let provider = provider_for(agent_name);
        let now = Utc::now();
        let wait = self.backoff.compute_wait(info.map(|i| i.reset_after));

        let snapshot = {
            let mut states = self.states.write();
            let state = states
                .entry(provider.clone())
                .or_insert_with(|| ProviderState::new(provider.clone(), now));

            state.is_limited = true;
            state.wait_count += 1;
            let candidate_reset = now + chrono::Duration::from_std(wait).unwrap_or_default();
            if candidate_reset > state.reset_at {
                state.reset_at = candidate_reset;
            }
            if let Some(info) = info {
                state.reset_after = Some(info.reset_after);
                if !info.message.is_empty() {
                    state.last_message = Some(info.message.clone());
                }
            }
            state.updated_at = now;
            state.clone()
        };

        info!(provider = %snapshot.provider, wait_count = snapshot.wait_count, "recorded rate limit");
        self.fire_callback(&snapshot);
        snapshot
    }

    /// Clear the limited flag for `agent_name`'s provider. `wait_count` is
    /// preserved. A no-op (callback not invoked) when no state exists yet.
    pub fn clear_rate_limit(&self, agent_name: &str) {
        let provider = provider_for(agent_name);
        let snapshot = {
            let mut states = self.states.write();
            match states.get_mut(&provider) {
                Some(state) => {
                    state.is_limited = false;
                    state.updated_at = Utc::now();
                    Some(state.clone())
                }
                None => None,
            }
        };

        if let Some(snapshot) = snapshot {
            debug!(provider = %snapshot.provider, "cleared rate limit");
            self.fire_callback(&snapshot);
        }
    }

    /// A copy of the current state when `agent_name`'s provider is
    /// currently blocking, else `None`.
    pub fn should_wait(&self, agent_name: &str) -> Option<ProviderState> {
        let provider = provider_for(agent_name);
        let states = self.states.read();
        states
            .get(&provider)
            .filter(|s| s.is_blocking(Utc::now()))
            .cloned()
    }

    /// Suspend until `agent_name`'s provider clears, the max-waits ceiling
    /// has already been hit, or `cancel` fires.
    pub async fn wait_for_reset(&self, agent_name: &str, cancel: &CancelToken) -> Result<()> {
        let Some(state) = self.should_wait(agent_name) else {
            return Ok(());
        };

        if self.exceeded_max_waits(agent_name) {
            return Err(AgentPipeError::RateLimitMaxExceeded(state.provider));
        }

        let now = Utc::now();
        let remaining = (state.reset_at - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentPipeError::Cancelled),
            _ = tokio::time::sleep(remaining) => Ok(()),
        }
    }

    /// `true` iff `max_waits == 0` or `wait_count >= max_waits` for
    /// `agent_name`'s provider.
    pub fn exceeded_max_waits(&self, agent_name: &str) -> bool {
        if self.backoff.max_waits == 0 {
            return true;
        }
        let provider = provider_for(agent_name);
        let states = self.states.read();
        states
            .get(&provider)
            .map(|s| s.wait_count >= self.backoff.max_waits)
            .unwrap_or(false)
    }

    /// A copy of `agent_name`'s provider state, if any has ever been
    /// recorded.
    pub fn get_state(&self, agent_name: &str) -> Option<ProviderState> {
        let provider = provider_for(agent_name);
        self.states.read().get(&provider).cloned()
    }

    /// A copy of every known provider's state, sorted by provider name.
    pub fn all_states(&self) -> Vec<ProviderState> {
        let states = self.states.read();
        let mut all: Vec<ProviderState> = states.values().cloned().collect();
        all.sort_by(|a, b| a.provider.cmp(&b.provider));
        all
    }

    fn fire_callback(&self, state: &ProviderState) {
        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            callback(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RateLimitInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn coordinator(max_waits: u32) -> RateLimitCoordinator {
        RateLimitCoordinator::new(BackoffConfig {
            default_wait: Duration::from_millis(20),
            max_waits,
            jitter_factor: 0.0,
        })
    }

    #[test]
    fn record_rate_limit_marks_provider_limited() {
        let coord = coordinator(5);
        let snapshot = coord.record_rate_limit("claude", None);
        assert!(snapshot.is_limited);
        assert_eq!(snapshot.wait_count, 1);
        assert_eq!(snapshot.provider, "anthropic");
    }

    #[test]
    fn reset_at_is_monotonically_non_decreasing() {
        let coord = coordinator(10);
        let first = coord.record_rate_limit(
            "claude",
            Some(&RateLimitInfo {
                is_limited: true,
                reset_after: Duration::from_secs(5),
                message: "wait 5s".into(),
            }),
        );
        let second = coord.record_rate_limit(
            "claude",
            Some(&RateLimitInfo {
                is_limited: true,
                reset_after: Duration::from_millis(1),
                message: "wait 1ms".into(),
            }),
        );
        assert!(second.reset_at >= first.reset_at);
    }

    #[test]
    fn provider_isolation_holds() {
        let coord = coordinator(5);
        coord.record_rate_limit("claude", None);
        assert!(coord.should_wait("codex").is_none());
        assert!(coord.should_wait("claude").is_some());
    }

    #[test]
    fn clear_rate_limit_preserves_wait_count() {
        let coord = coordinator(5);
        coord.record_rate_limit("claude", None);
        coord.record_rate_limit("claude", None);
        coord.clear_rate_limit("claude");
        let state = coord.get_state("claude").unwrap();
        assert!(!state.is_limited);
        assert_eq!(state.wait_count, 2);
    }

    #[test]
    fn clear_rate_limit_is_noop_when_absent() {
        let coord = coordinator(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        coord.set_update_callback(Some(Arc::new(move |_state: &ProviderState| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })));
        coord.clear_rate_limit("nobody-has-recorded-this-agent");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exceeded_max_waits_true_when_max_is_zero_regardless_of_state() {
        let coord = coordinator(0);
        assert!(coord.exceeded_max_waits("claude"));
        coord.record_rate_limit("claude", None);
        assert!(coord.exceeded_max_waits("claude"));
    }

    #[tokio::test]
    async fn wait_for_reset_returns_immediately_when_not_limited() {
        let coord = coordinator(5);
        let (_h, token) = crate::cancel::cancel_pair();
        coord.wait_for_reset("claude", &token).await.unwrap();
    }

    #[tokio::test]
    async fn wait_for_reset_errors_when_max_waits_exceeded() {
        let coord = coordinator(2);
        coord.record_rate_limit(
            "claude",
            Some(&RateLimitInfo {
                is_limited: true,
                reset_after: Duration::ZERO,
                message: String::new(),
            }),
        );
        coord.record_rate_limit(
            "claude",
            Some(&RateLimitInfo {
                is_limited: true,
                reset_after: Duration::ZERO,
                message: String::new(),
            }),
        );
        let (_h, token) = crate::cancel::cancel_pair();
        let err = coord.wait_for_reset("claude", &token).await.unwrap_err();
        assert!(matches!(err, AgentPipeError::RateLimitMaxExceeded(_)));
    }

    #[tokio::test]
    async fn wait_for_reset_honors_cancellation() {
        let coord = RateLimitCoordinator::new(BackoffConfig {
            default_wait: Duration::from_secs(60),
            max_waits: 5,
            jitter_factor: 0.0,
        });
        coord.record_rate_limit("claude", None);

        let (handle, token) = crate::cancel::cancel_pair();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let start = std::time::Instant::now();
        let err = coord.wait_for_reset("claude", &token).await.unwrap_err();
        assert!(matches!(err, AgentPipeError::Cancelled));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn all_states_sorted_by_provider_name() {
        let coord = coordinator(5);
        coord.record_rate_limit("gemini", None);
        coord.record_rate_limit("claude", None);
        coord.record_rate_limit("codex", None);
        let names: Vec<String> = coord.all_states().iter().map(|s| s.provider.clone()).collect();
        assert_eq!(names, vec!["anthropic", "google", "openai"]);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let coord = coordinator(5);
        let mut snapshot = coord.record_rate_limit("claude", None);
        snapshot.wait_count = 999;
        let live = coord.get_state("claude").unwrap();
        assert_eq!(live.wait_count, 1);
    }
}
