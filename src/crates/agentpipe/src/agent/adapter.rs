//! The uniform contract over heterogeneous agent CLIs.

use super::types::{RateLimitInfo, RunOpts, RunResult};
use crate::cancel::CancelToken;
use crate::Result;
use async_trait::async_trait;

/// A capability interface implemented by every agent variant (Claude-style,
/// Codex-style, the Gemini stub, and the configurable mock).
#[async_trait]
pub trait Agent: Send + Sync {
    /// The adapter's registry name, e.g. `"claude"`.
    fn name(&self) -> &str;

    /// Verify the configured executable is reachable on `PATH`.
    async fn check_prerequisites(&self) -> Result<()>;

    /// Spawn the agent subprocess and capture its outcome.
    async fn run(&self, opts: &RunOpts, cancel: &CancelToken) -> Result<RunResult>;

    /// Inspect combined stdout+stderr text for a rate-limit signal.
    fn parse_rate_limit(&self, text: &str) -> Option<RateLimitInfo>;

    /// Render the command this invocation would run, without running it.
    /// Prompts longer than 120 runes are truncated with `"..."`.
    fn dry_run_command(&self, opts: &RunOpts) -> String;
}
