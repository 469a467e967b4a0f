//! The per-phase workflow engine: an external collaborator, injected by
//! the host, that actually walks a [`WorkflowDef`] and drives agents
//! through its steps. Its internals are out of scope here; only the
//! contract the orchestrator depends on is defined.

use super::metadata::PhaseResult;
use super::workflow::WorkflowDef;
use crate::cancel::CancelToken;
use crate::config::{Phase, PipelineOpts};
use crate::Result;
use async_trait::async_trait;

/// Everything a single phase run needs that isn't already carried by
/// the [`WorkflowDef`] itself.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub phase: Phase,
    pub branch_name: String,
    pub opts: PipelineOpts,
}

/// Drives one phase's workflow graph to completion (or failure).
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn run(&self, def: &WorkflowDef, ctx: &EngineContext, cancel: &CancelToken) -> Result<PhaseResult>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A configurable [`WorkflowEngine`] test double. By default every
    /// phase succeeds with no PR; override per-phase-id behavior with
    /// [`MockWorkflowEngine::with_result`] or make every phase fail with
    /// [`MockWorkflowEngine::always_failing`].
    #[derive(Clone, Default)]
    pub struct MockWorkflowEngine {
        overrides: Arc<Mutex<std::collections::HashMap<u64, Result<PhaseResult>>>>,
        always_fail: Arc<Mutex<bool>>,
        invocations: Arc<Mutex<Vec<(u64, Vec<String>)>>>,
    }

    impl MockWorkflowEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_result(self, phase_id: u64, result: Result<PhaseResult>) -> Self {
            self.overrides.lock().insert(phase_id, result);
            self
        }

        pub fn always_failing(self) -> Self {
            *self.always_fail.lock() = true;
            self
        }

        /// `(phase_id, active_steps)` for every invocation, in call order.
        pub fn invocations(&self) -> Vec<(u64, Vec<String>)> {
            self.invocations.lock().clone()
        }
    }

    fn clone_result(result: &Result<PhaseResult>) -> Result<PhaseResult> {
        match result {
            Ok(r) => Ok(r.clone()),
            Err(e) => Err(crate::AgentPipeError::ResolveFailed(e.to_string())),
        }
    }

    #[async_trait]
    impl WorkflowEngine for MockWorkflowEngine {
        async fn run(&self, def: &WorkflowDef, ctx: &EngineContext, _cancel: &CancelToken) -> Result<PhaseResult> {
            self.invocations.lock().push((ctx.phase.id, def.active_steps()));

            if *self.always_fail.lock() {
                return Ok(PhaseResult {
                    error: Some("mock engine configured to always fail".to_string()),
                    ..Default::default()
                });
            }

            if let Some(result) = self.overrides.lock().get(&ctx.phase.id) {
                return clone_result(result);
            }

            Ok(PhaseResult::default())
        }
    }
}
