//! `PipelineOrchestrator`: sequences configured phases through their
//! skip-flag-pruned workflow graph, checkpointing after each one.

use super::engine::{EngineContext, WorkflowEngine};
use super::metadata::{PhaseMetadata, PhaseResult, PipelineMetadata, PipelineStatus};
use super::phase_source::PhaseSource;
use super::state_store::{StateStore, WorkflowState};
use super::workflow::{apply_skip_flags, WorkflowDef};
use crate::agent::AgentRegistry;
use crate::branch::{BranchManager, PhaseBranchOpts};
use crate::cancel::CancelToken;
use crate::config::{Phase, PipelineOpts};
use crate::{AgentPipeError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Ambient inputs to a run that aren't part of the tunable [`PipelineOpts`].
#[derive(Clone)]
pub struct RunContext {
    pub cancel: CancelToken,
    pub project_name: String,
    pub base_branch: String,
}

/// Sequences every selected phase through its pruned workflow graph.
pub struct PipelineOrchestrator {
    agents: AgentRegistry,
    phase_source: Arc<dyn PhaseSource>,
    state_store: Arc<dyn StateStore>,
    branch_manager: BranchManager,
    engine: Arc<dyn WorkflowEngine>,
    default_agent: String,
    workflow_name: String,
}

impl PipelineOrchestrator {
    pub fn new(
        agents: AgentRegistry,
        phase_source: Arc<dyn PhaseSource>,
        state_store: Arc<dyn StateStore>,
        branch_manager: BranchManager,
        engine: Arc<dyn WorkflowEngine>,
        default_agent: impl Into<String>,
        workflow_name: impl Into<String>,
    ) -> Self {
        Self {
            agents,
            phase_source,
            state_store,
            branch_manager,
            engine,
            default_agent: default_agent.into(),
            workflow_name: workflow_name.into(),
        }
    }

    /// Run the whole pipeline to completion (or partial/failed exit).
    pub async fn run(&self, ctx: &RunContext, opts: &PipelineOpts) -> Result<PipelineMetadata> {
        let phases = self.resolve_phases(opts)?;
        let opts = self.normalize_agents(opts);

        let (pipeline_id, mut metadata, start_index) = match self.resume_state().await? {
            Some((id, metadata)) => {
                let start = metadata.current_phase;
                (id, metadata, start)
            }
            None => {
                let phase_records: Vec<PhaseMetadata> =
                    phases.iter().map(|p| PhaseMetadata::new(p.id, p.name.clone())).collect();
                let id = format!("pipeline-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0));
                (id.clone(), PipelineMetadata::new(id, self.workflow_name.clone(), phase_records), 0)
            }
        };
        metadata.opts = (&opts).into();

        for i in start_index..phases.len() {
            if ctx.cancel.is_cancelled() {
                for j in i..phases.len() {
                    metadata.update_phase_status(j, super::metadata::PhaseStatus::Pending);
                }
                self.checkpoint(&pipeline_id, &metadata).await;
                return Err(AgentPipeError::Cancelled);
            }

            self.run_one_phase(&phases[i], i, &opts, ctx, &mut metadata).await;
            metadata.current_phase = i + 1;
            self.checkpoint(&pipeline_id, &metadata).await;
        }

        metadata.status = self.aggregate_status(&metadata);
        metadata.completed_at = Some(Utc::now());
        self.checkpoint(&pipeline_id, &metadata).await;
        Ok(metadata)
    }

    async fn run_one_phase(
        &self,
        phase: &Phase,
        index: usize,
        opts: &PipelineOpts,
        ctx: &RunContext,
        metadata: &mut PipelineMetadata,
    ) {
        let previous_branch = if index > 0 {
            metadata.phases[index - 1].branch_name.clone()
        } else {
            String::new()
        };

        let branch_opts = PhaseBranchOpts {
            phase_id: phase.id,
            phase_name: phase.name.clone(),
            project_name: ctx.project_name.clone(),
            previous_phase_branch: previous_branch,
            base_branch: ctx.base_branch.clone(),
            sync_base: true,
        };

        let branch_name = if self.branch_manager.has_git_client() {
            match self.branch_manager.ensure_branch(&branch_opts).await {
                Ok(name) => name,
                Err(e) => {
                    metadata.update_phase_status(index, super::metadata::PhaseStatus::Failed);
                    metadata.set_phase_result(index, PhaseResult { error: Some(e.to_string()), ..Default::default() });
                    return;
                }
            }
        } else {
            self.branch_manager.resolve_branch_name(phase.id, &phase.name, &ctx.project_name)
        };
        metadata.phases[index].branch_name = branch_name.clone();

        let canonical = WorkflowDef::canonical();
        let def = apply_skip_flags(&canonical, opts);
        if def.is_empty() {
            metadata.update_phase_status(index, super::metadata::PhaseStatus::Completed);
            return;
        }

        let engine_ctx = EngineContext { phase: phase.clone(), branch_name, opts: opts.clone() };

        match self.engine.run(&def, &engine_ctx, &ctx.cancel).await {
            Ok(result) if result.error.is_none() => {
                metadata.set_phase_result(index, result);
                metadata.update_phase_status(index, super::metadata::PhaseStatus::Completed);
            }
            Ok(result) => {
                metadata.set_phase_result(index, result);
                metadata.update_phase_status(index, super::metadata::PhaseStatus::Failed);
            }
            Err(e) => {
                metadata.update_phase_status(index, super::metadata::PhaseStatus::Failed);
                metadata.set_phase_result(index, PhaseResult { error: Some(e.to_string()), ..Default::default() });
            }
        }
    }

    /// Human-readable plan: no side effects.
    pub fn dry_run(&self, ctx: &RunContext, opts: &PipelineOpts) -> Result<String> {
        let phases = self.resolve_phases(opts)?;
        let opts = self.normalize_agents(opts);
        let canonical = WorkflowDef::canonical();
        let def = apply_skip_flags(&canonical, &opts);

        let mut out = format!("pipeline plan: {} phase(s)\n", phases.len());
        for phase in &phases {
            let branch = self.branch_manager.resolve_branch_name(phase.id, &phase.name, &ctx.project_name);
            out.push_str(&format!(
                "- phase {} ({}): {} -> {}\n  branch: {}\n  steps: {}\n  agents: impl={} review={} fix={}\n",
                phase.id,
                phase.name,
                phase.start_task,
                phase.end_task,
                branch,
                def.active_steps().join(", "),
                opts.impl_agent,
                opts.review_agent,
                opts.fix_agent,
            ));
        }
        Ok(out)
    }

    fn resolve_phases(&self, opts: &PipelineOpts) -> Result<Vec<Phase>> {
        let phases = self.phase_source.phases()?;
        opts.phase_selector
            .resolve(&phases)
            .ok_or_else(|| AgentPipeError::ResolveFailed("no phases matched the configured selector".to_string()))
    }

    fn normalize_agents(&self, opts: &PipelineOpts) -> PipelineOpts {
        let mut opts = opts.clone();
        opts.impl_agent = self.normalize_agent(&opts.impl_agent);
        opts.review_agent = self.normalize_agent(&opts.review_agent);
        opts.fix_agent = self.normalize_agent(&opts.fix_agent);
        opts
    }

    fn normalize_agent(&self, name: &str) -> String {
        if name.is_empty() || !self.agents.contains(name) {
            self.default_agent.clone()
        } else {
            name.to_string()
        }
    }

    async fn resume_state(&self) -> Result<Option<(String, PipelineMetadata)>> {
        let Some(state) = self.state_store.latest_run().await? else {
            return Ok(None);
        };
        if state.workflow_name != self.workflow_name {
            return Ok(None);
        }
        let metadata = PipelineMetadata::from_map(state.metadata)?;
        if matches!(metadata.status, PipelineStatus::Completed | PipelineStatus::Failed) {
            return Ok(None);
        }
        Ok(Some((state.id, metadata)))
    }

    fn aggregate_status(&self, metadata: &PipelineMetadata) -> PipelineStatus {
        let succeeded = metadata
            .phases
            .iter()
            .filter(|p| matches!(p.status, super::metadata::PhaseStatus::Completed | super::metadata::PhaseStatus::Skipped))
            .count();
        if succeeded == metadata.phases.len() {
            PipelineStatus::Completed
        } else if succeeded == 0 {
            PipelineStatus::Failed
        } else {
            PipelineStatus::Partial
        }
    }

    async fn checkpoint(&self, pipeline_id: &str, metadata: &PipelineMetadata) {
        let map = match metadata.to_metadata_map() {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "failed to serialize checkpoint metadata");
                return;
            }
        };
        let state = WorkflowState {
            id: pipeline_id.to_string(),
            workflow_name: self.workflow_name.clone(),
            current_step: format!("phase-{}", metadata.current_phase),
            metadata: map,
            updated_at: Utc::now(),
        };
        if let Err(e) = self.state_store.save(state).await {
            warn!(error = %e, "pipeline checkpoint persistence failed, continuing");
        }
    }
}
