//! Phase sequencing: workflow graphs, checkpoint metadata, and the
//! orchestrator that ties them to the agent/branch/rate-limit layers.

mod engine;
mod metadata;
mod orchestrator;
mod phase_source;
mod state_store;
mod workflow;

pub use engine::{EngineContext, WorkflowEngine};
pub use metadata::{
    PhaseMetadata, PhaseResult, PhaseStage, PhaseStatus, PipelineMetadata, PipelineOptsSnapshot, PipelineStatus,
    ReviewVerdict, StageStatus,
};
pub use orchestrator::{PipelineOrchestrator, RunContext};
pub use phase_source::{PhaseSource, PipeSeparatedPhaseSource};
pub use state_store::{JsonFileStateStore, StateStore, WorkflowState};
pub use workflow::{apply_skip_flags, Step, WorkflowDef, TERMINAL_STEP};

#[cfg(test)]
pub(crate) use engine::mock::MockWorkflowEngine;
