//! End-to-end seed scenarios driving the orchestrator and stream decoder
//! through their public surface only.

use agentpipe::agent::AgentRegistry;
use agentpipe::branch::{BranchManager, GitClient};
use agentpipe::cancel::cancel_pair;
use agentpipe::config::PipelineOpts;
use agentpipe::pipeline::{
    EngineContext, PhaseResult, PhaseStatus, PipeSeparatedPhaseSource, PipelineMetadata, PipelineOrchestrator,
    PipelineStatus, ReviewVerdict, RunContext, StageStatus, WorkflowDef, WorkflowEngine,
};
use agentpipe::stream::{decode, StreamEvent};
use agentpipe::{CancelToken, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeGit {
    existing: Mutex<HashSet<String>>,
}

#[async_trait]
impl GitClient for FakeGit {
    async fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.existing.lock().contains(name))
    }
    async fn create_branch(&self, name: &str, _base: &str) -> Result<()> {
        self.existing.lock().insert(name.to_string());
        Ok(())
    }
    async fn checkout(&self, _name: &str) -> Result<()> {
        Ok(())
    }
    async fn fetch(&self, _remote: &str) -> Result<()> {
        Ok(())
    }
}

/// A host-supplied engine: succeeds every step unless `fail_implement` is
/// set, in which case any graph still containing `run_implement` fails.
#[derive(Clone, Default)]
struct FakeEngine {
    fail_implement: bool,
    invoked_steps: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl WorkflowEngine for FakeEngine {
    async fn run(&self, def: &WorkflowDef, _ctx: &EngineContext, _cancel: &CancelToken) -> Result<PhaseResult> {
        let steps = def.active_steps();
        self.invoked_steps.lock().push(steps.clone());

        if self.fail_implement && steps.iter().any(|s| s == "run_implement") {
            return Ok(PhaseResult { error: Some("implement step failed".to_string()), ..Default::default() });
        }

        Ok(PhaseResult {
            impl_status: StageStatus::Completed,
            review_verdict: ReviewVerdict::Approved,
            fix_status: StageStatus::Skipped,
            pr_url: if steps.iter().any(|s| s == "create_pr") {
                "https://example.invalid/pr/1".to_string()
            } else {
                String::new()
            },
            error: None,
        })
    }
}

fn run_ctx() -> RunContext {
    RunContext {
        cancel: cancel_pair().1,
        project_name: "demo".to_string(),
        base_branch: "main".to_string(),
    }
}

fn orchestrator(engine: FakeEngine, phases: &str, db_path: std::path::PathBuf) -> PipelineOrchestrator {
    PipelineOrchestrator::new(
        AgentRegistry::new(),
        Arc::new(PipeSeparatedPhaseSource::new(phases)),
        Arc::new(agentpipe::pipeline::JsonFileStateStore::new(db_path)),
        BranchManager::new(Some(Arc::new(FakeGit::default())), None),
        Arc::new(engine),
        "claude",
        "agentpipe",
    )
}

/// S1: three phases, every step succeeds.
#[tokio::test]
async fn s1_three_phases_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        FakeEngine::default(),
        "1|Foundation|t1|t2\n2|Implementation|t3|t4\n3|Integration & Testing|t5|t6\n",
        dir.path().join("db.json"),
    );

    let metadata = orch.run(&run_ctx(), &PipelineOpts::default()).await.unwrap();

    assert_eq!(metadata.status, PipelineStatus::Completed);
    assert!(metadata.phases.iter().all(|p| p.status == PhaseStatus::Completed));
    assert_eq!(metadata.phases[0].branch_name, "phase/1-foundation");
    assert_eq!(metadata.phases[1].branch_name, "phase/2-implementation");
    assert_eq!(metadata.phases[2].branch_name, "phase/3-integration-testing");
    assert!(metadata.phases.iter().all(|p| p.pr_url.starts_with("https://")));
}

/// S2: the implement step always fails; pipeline and every phase fail,
/// and `create_pr` is never reached.
#[tokio::test]
async fn s2_implement_always_fails() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine { fail_implement: true, ..Default::default() };
    let invoked = engine.invoked_steps.clone();
    let orch = orchestrator(engine, "1|Foundation|t1|t2\n2|Implementation|t3|t4\n", dir.path().join("db.json"));

    let metadata = orch.run(&run_ctx(), &PipelineOpts::default()).await.unwrap();

    assert_eq!(metadata.status, PipelineStatus::Failed);
    assert!(metadata.phases.iter().all(|p| p.status == PhaseStatus::Failed));
    assert!(metadata.phases.iter().all(|p| p.pr_url.is_empty()));
    for steps in invoked.lock().iter() {
        assert!(!steps.contains(&"create_pr".to_string()));
    }
}

/// S3: skipping implement and PR still creates branches and invokes the
/// engine only with the review/fix steps.
#[tokio::test]
async fn s3_skip_implement_and_pr() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let invoked = engine.invoked_steps.clone();
    let orch = orchestrator(engine, "1|Foundation|t1|t2\n2|Implementation|t3|t4\n", dir.path().join("db.json"));

    let opts = PipelineOpts { skip_implement: true, skip_pr: true, ..Default::default() };
    let metadata = orch.run(&run_ctx(), &opts).await.unwrap();

    assert_eq!(metadata.status, PipelineStatus::Completed);
    assert!(metadata.phases.iter().all(|p| !p.branch_name.is_empty()));
    for steps in invoked.lock().iter() {
        assert!(!steps.contains(&"run_implement".to_string()));
        assert!(!steps.contains(&"create_pr".to_string()));
        assert!(steps.contains(&"run_review".to_string()));
    }
}

/// S7: a push-mode decode sees 3 valid events interleaved with one
/// malformed and one blank line, and delivers exactly the 3 valid ones
/// in order.
#[tokio::test]
async fn s7_push_mode_decoder_skips_malformed_lines() {
    let input = "{\"type\":\"system\"}\nnot json at all\n\n{\"type\":\"result\",\"is_error\":false}\n{\"type\":\"custom\"}\n";
    let (tx, mut rx) = mpsc::channel(16);
    let (_handle, token) = cancel_pair();

    decode(std::io::Cursor::new(input.as_bytes().to_vec()), tx, token).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }

    assert_eq!(received.len(), 3);
    assert!(matches!(received[0], StreamEvent::System { .. }));
    assert!(matches!(received[1], StreamEvent::Result { .. }));
    assert!(matches!(received[2], StreamEvent::Other(_)));
}

/// S8: `SetPhaseResult` on phase 0 only, round-tripped through the
/// metadata map, leaves phases 1 and 2 untouched.
#[test]
fn s8_metadata_round_trip_touches_only_the_targeted_phase() {
    use agentpipe::pipeline::PhaseMetadata;

    let mut metadata = PipelineMetadata::new(
        "p1",
        "agentpipe",
        vec![PhaseMetadata::new(1, "Foundation"), PhaseMetadata::new(2, "Implementation"), PhaseMetadata::new(3, "Integration")],
    );
    metadata.set_phase_result(
        0,
        PhaseResult { pr_url: "https://example.invalid/pr/9".to_string(), ..Default::default() },
    );

    let map = metadata.to_metadata_map().unwrap();
    let restored = PipelineMetadata::from_map(map).unwrap();

    assert_eq!(restored.phases[0].pr_status, "created");
    assert!(restored.phases[0].completed_at.is_some());
    assert_eq!(restored.phases[1].status, PhaseStatus::Pending);
    assert_eq!(restored.phases[2].status, PhaseStatus::Pending);
}
