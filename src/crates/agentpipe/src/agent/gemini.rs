//! Gemini CLI adapter stub.
//!
//! No production wiring to the `gemini` CLI exists yet; this variant
//! exists so the registry can name a `"gemini"` agent in configuration
//! today without every call site special-casing its absence.

use super::adapter::Agent;
use super::types::{RateLimitInfo, RunOpts, RunResult};
use crate::cancel::CancelToken;
use crate::{AgentPipeError, Result};
use async_trait::async_trait;

pub struct GeminiAgent {
    name: String,
}

impl GeminiAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for GeminiAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_prerequisites(&self) -> Result<()> {
        Err(AgentPipeError::NotImplemented(self.name.clone()))
    }

    async fn run(&self, _opts: &RunOpts, _cancel: &CancelToken) -> Result<RunResult> {
        Err(AgentPipeError::NotImplemented(self.name.clone()))
    }

    fn parse_rate_limit(&self, _text: &str) -> Option<RateLimitInfo> {
        None
    }

    fn dry_run_command(&self, _opts: &RunOpts) -> String {
        format!("{} <not implemented>", self.name)
    }
}
