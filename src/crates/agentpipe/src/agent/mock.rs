//! A fully configurable agent test double.

use super::adapter::Agent;
use super::types::{RateLimitInfo, RunOpts, RunResult};
use crate::cancel::CancelToken;
use crate::{AgentPipeError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

type RunFn = dyn Fn(&RunOpts) -> Result<RunResult> + Send + Sync;

/// Builder-constructed stand-in for a real CLI adapter, used throughout
/// the pipeline and rate-limit test suites.
pub struct MockAgent {
    name: String,
    prerequisites_ok: bool,
    run_fn: Option<Arc<RunFn>>,
    default_result: RunResult,
    rate_limit_text: Option<String>,
    calls: Arc<Mutex<Vec<RunOpts>>>,
}

impl MockAgent {
    /// A mock that always succeeds with empty output.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prerequisites_ok: true,
            run_fn: None,
            default_result: RunResult {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
                duration: Duration::ZERO,
                rate_limit: None,
            },
            rate_limit_text: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail [`Agent::check_prerequisites`].
    pub fn with_missing_prerequisites(mut self) -> Self {
        self.prerequisites_ok = false;
        self
    }

    /// Fix the exit code returned from every [`Agent::run`] call.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.default_result.exit_code = code;
        self
    }

    /// Fix the stdout text returned from every [`Agent::run`] call.
    pub fn with_stdout(mut self, text: impl Into<String>) -> Self {
        self.default_result.stdout = text.into();
        self
    }

    /// Substitute a closure for full control over each invocation's
    /// result, including returning an error.
    pub fn with_run_fn(mut self, f: impl Fn(&RunOpts) -> Result<RunResult> + Send + Sync + 'static) -> Self {
        self.run_fn = Some(Arc::new(f));
        self
    }

    /// Make [`Agent::parse_rate_limit`] match whenever the scanned text
    /// contains `needle`, returning a fixed zero-duration finding.
    pub fn with_rate_limit_trigger(mut self, needle: impl Into<String>) -> Self {
        self.rate_limit_text = Some(needle.into());
        self
    }

    /// Every [`RunOpts`] this mock has been invoked with, in order.
    pub fn calls(&self) -> Vec<RunOpts> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_prerequisites(&self) -> Result<()> {
        if self.prerequisites_ok {
            Ok(())
        } else {
            Err(AgentPipeError::NotFound(self.name.clone()))
        }
    }

    async fn run(&self, opts: &RunOpts, _cancel: &CancelToken) -> Result<RunResult> {
        self.calls.lock().push(opts.clone());
        match &self.run_fn {
            Some(f) => f(opts),
            None => Ok(self.default_result.clone()),
        }
    }

    fn parse_rate_limit(&self, text: &str) -> Option<RateLimitInfo> {
        let needle = self.rate_limit_text.as_ref()?;
        if text.contains(needle.as_str()) {
            Some(RateLimitInfo {
                is_limited: true,
                reset_after: Duration::ZERO,
                message: needle.clone(),
            })
        } else {
            None
        }
    }

    fn dry_run_command(&self, _opts: &RunOpts) -> String {
        format!("mock:{}", self.name)
    }
}
