//! Pipeline and phase checkpoint records, and their JSON map round trip.

use crate::config::PipelineOpts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Phase lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Implementing,
    Reviewing,
    Fixing,
    PrCreating,
    PrCreated,
    Completed,
    Failed,
    Skipped,
}

/// Pipeline lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Running,
    Completed,
    Partial,
    Failed,
}

/// Generic per-stage status used for `impl_status` and `fix_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Review outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    #[default]
    Pending,
    Approved,
    ChangesNeeded,
    Blocking,
    Skipped,
}

/// Which per-phase stage a status update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStage {
    Impl,
    Review,
    Fix,
    Pr,
}

/// The outcome extracted from a completed (or failed) phase's workflow
/// run, fed into [`PipelineMetadata::set_phase_result`].
#[derive(Debug, Clone, Default)]
pub struct PhaseResult {
    pub impl_status: StageStatus,
    pub review_verdict: ReviewVerdict,
    pub fix_status: StageStatus,
    pub pr_url: String,
    pub error: Option<String>,
}

/// Per-phase checkpoint state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMetadata {
    pub phase_id: u64,
    pub phase_name: String,
    pub branch_name: String,
    pub status: PhaseStatus,
    pub impl_status: StageStatus,
    pub review_verdict: ReviewVerdict,
    pub fix_status: StageStatus,
    pub pr_url: String,
    pub pr_status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ns: u64,
    pub review_cycles: u32,
    pub error_message: String,
}

impl PhaseMetadata {
    /// A fresh, pending record for `phase_id`/`phase_name`.
    pub fn new(phase_id: u64, phase_name: impl Into<String>) -> Self {
        Self {
            phase_id,
            phase_name: phase_name.into(),
            branch_name: String::new(),
            status: PhaseStatus::Pending,
            impl_status: StageStatus::Pending,
            review_verdict: ReviewVerdict::Pending,
            fix_status: StageStatus::Pending,
            pr_url: String::new(),
            pr_status: String::new(),
            started_at: None,
            completed_at: None,
            duration_ns: 0,
            review_cycles: 0,
            error_message: String::new(),
        }
    }
}

/// Whole-run checkpoint state, serialized after every phase boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub pipeline_id: String,
    pub workflow_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: PipelineStatus,
    pub phases: Vec<PhaseMetadata>,
    pub current_phase: usize,
    pub total_phases: usize,
    pub opts: PipelineOptsSnapshot,
}

/// A JSON-friendly snapshot of the options a run was started with.
/// `PipelineOpts` itself is not `Serialize` (it is an operational
/// input, not state), so the checkpoint records only its scalar fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOptsSnapshot {
    pub skip_implement: bool,
    pub skip_review: bool,
    pub skip_fix: bool,
    pub skip_pr: bool,
    pub impl_agent: String,
    pub review_agent: String,
    pub fix_agent: String,
    pub review_concurrency: u32,
    pub max_review_cycles: u32,
}

impl From<&PipelineOpts> for PipelineOptsSnapshot {
    fn from(opts: &PipelineOpts) -> Self {
        Self {
            skip_implement: opts.skip_implement,
            skip_review: opts.skip_review,
            skip_fix: opts.skip_fix,
            skip_pr: opts.skip_pr,
            impl_agent: opts.impl_agent.clone(),
            review_agent: opts.review_agent.clone(),
            fix_agent: opts.fix_agent.clone(),
            review_concurrency: opts.review_concurrency,
            max_review_cycles: opts.max_review_cycles,
        }
    }
}

impl PipelineMetadata {
    /// Mint a fresh, running checkpoint for a newly started run.
    pub fn new(pipeline_id: impl Into<String>, workflow_name: impl Into<String>, phases: Vec<PhaseMetadata>) -> Self {
        let total_phases = phases.len();
        Self {
            pipeline_id: pipeline_id.into(),
            workflow_name: workflow_name.into(),
            started_at: Utc::now(),
            completed_at: None,
            status: PipelineStatus::Running,
            phases,
            current_phase: 0,
            total_phases,
            opts: PipelineOptsSnapshot::default(),
        }
    }

    /// Silent no-op on an out-of-bounds index.
    pub fn update_phase_status(&mut self, index: usize, status: PhaseStatus) {
        if let Some(phase) = self.phases.get_mut(index) {
            phase.status = status;
        }
    }

    /// Silent no-op on an out-of-bounds index. `Impl`/`Fix` updates use
    /// [`StageStatus`]'s wire values via a best-effort cast from the
    /// shared status vocabulary.
    pub fn update_phase_stage(&mut self, index: usize, stage: PhaseStage, status: StageStatus) {
        let Some(phase) = self.phases.get_mut(index) else {
            return;
        };
        match stage {
            PhaseStage::Impl => phase.impl_status = status,
            PhaseStage::Fix => phase.fix_status = status,
            // Review/PR carry richer vocabularies tracked elsewhere
            // (`review_verdict`, `pr_status`); a generic stage-status
            // update here only records PR completion.
            PhaseStage::Review => {}
            PhaseStage::Pr if status == StageStatus::Completed => {
                phase.pr_status = "created".to_string();
            }
            PhaseStage::Pr => {}
        }
    }

    /// Apply `result` to phase `index`: silent no-op if out of bounds.
    /// Sets `completed_at = now`; sets `pr_status = "created"` when
    /// `result.pr_url` is non-empty, otherwise leaves `pr_status`
    /// untouched.
    pub fn set_phase_result(&mut self, index: usize, result: PhaseResult) {
        let Some(phase) = self.phases.get_mut(index) else {
            return;
        };
        phase.impl_status = result.impl_status;
        phase.review_verdict = result.review_verdict;
        phase.fix_status = result.fix_status;
        if !result.pr_url.is_empty() {
            phase.pr_url = result.pr_url;
            phase.pr_status = "created".to_string();
        }
        if let Some(error) = result.error {
            phase.error_message = error;
        }
        phase.completed_at = Some(Utc::now());
    }

    /// First index whose status is neither `completed` nor `skipped`,
    /// or `None`.
    pub fn next_incomplete_phase(&self) -> Option<usize> {
        self.phases
            .iter()
            .position(|p| !matches!(p.status, PhaseStatus::Completed | PhaseStatus::Skipped))
    }

    /// `true` iff [`Self::next_incomplete_phase`] is `None`.
    pub fn is_complete(&self) -> bool {
        self.next_incomplete_phase().is_none()
    }

    /// One-line human-readable progress string. Never panics on an
    /// out-of-range `current_phase`.
    pub fn summary(&self) -> String {
        let done = self
            .phases
            .iter()
            .filter(|p| matches!(p.status, PhaseStatus::Completed | PhaseStatus::Skipped))
            .count();

        let current = self.phases.get(self.current_phase).map(|p| format!(", phase {} is {:?}", p.phase_id, p.status));

        format!("{done}/{} phases complete{}", self.total_phases, current.unwrap_or_default())
    }

    /// Round-trip through a JSON intermediate, producing an ordered
    /// key-value map suitable for an external state store's opaque
    /// `metadata` field.
    pub fn to_metadata_map(&self) -> crate::Result<Map<String, Value>> {
        let value = serde_json::to_value(self)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Inverse of [`Self::to_metadata_map`]. Tolerates unknown keys,
    /// missing keys (zero-valued), and a completely empty map (returns
    /// a zero-value metadata without error).
    pub fn from_map(map: Map<String, Value>) -> crate::Result<Self> {
        if map.is_empty() {
            return Ok(Self::new("", "", Vec::new()));
        }
        let value = Value::Object(map);
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_phases() -> Vec<PhaseMetadata> {
        vec![
            PhaseMetadata::new(1, "Foundation"),
            PhaseMetadata::new(2, "Implementation"),
            PhaseMetadata::new(3, "Integration & Testing"),
        ]
    }

    #[test]
    fn next_incomplete_phase_skips_completed_and_skipped() {
        let mut meta = PipelineMetadata::new("p1", "demo", three_phases());
        meta.update_phase_status(0, PhaseStatus::Completed);
        meta.update_phase_status(1, PhaseStatus::Skipped);
        assert_eq!(meta.next_incomplete_phase(), Some(2));
    }

    #[test]
    fn is_complete_true_only_when_every_phase_done_or_skipped() {
        let mut meta = PipelineMetadata::new("p1", "demo", three_phases());
        assert!(!meta.is_complete());
        for i in 0..3 {
            meta.update_phase_status(i, PhaseStatus::Completed);
        }
        assert!(meta.is_complete());
    }

    #[test]
    fn out_of_bounds_updates_are_silent_no_ops() {
        let mut meta = PipelineMetadata::new("p1", "demo", three_phases());
        meta.update_phase_status(99, PhaseStatus::Completed);
        meta.set_phase_result(99, PhaseResult::default());
        assert_eq!(meta.phases.len(), 3);
        assert_eq!(meta.phases[0].status, PhaseStatus::Pending);
    }

    #[test]
    fn set_phase_result_sets_pr_status_only_when_pr_url_present() {
        let mut meta = PipelineMetadata::new("p1", "demo", three_phases());
        meta.set_phase_result(
            0,
            PhaseResult {
                pr_url: "https://example.invalid/pr/1".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(meta.phases[0].pr_status, "created");
        assert!(meta.phases[0].completed_at.is_some());

        meta.set_phase_result(1, PhaseResult::default());
        assert_eq!(meta.phases[1].pr_status, "");
        assert!(meta.phases[1].completed_at.is_some());
    }

    #[test]
    fn to_map_from_map_round_trips_structural_fields() {
        let mut meta = PipelineMetadata::new("p1", "demo", three_phases());
        meta.set_phase_result(
            0,
            PhaseResult {
                pr_url: "https://example.invalid/pr/7".to_string(),
                ..Default::default()
            },
        );

        let map = meta.to_metadata_map().unwrap();
        let restored = PipelineMetadata::from_map(map).unwrap();

        assert_eq!(restored.pipeline_id, "p1");
        assert_eq!(restored.phases.len(), 3);
        assert_eq!(restored.phases[0].pr_status, "created");
        assert!(restored.phases[0].completed_at.is_some());
        assert_eq!(restored.phases[1].status, PhaseStatus::Pending);
        assert_eq!(restored.phases[2].status, PhaseStatus::Pending);
    }

    #[test]
    fn from_map_on_empty_map_returns_zero_value_without_error() {
        let restored = PipelineMetadata::from_map(Map::new()).unwrap();
        assert_eq!(restored.pipeline_id, "");
        assert!(restored.phases.is_empty());
    }

    #[test]
    fn summary_never_panics_on_out_of_range_current_phase() {
        let mut meta = PipelineMetadata::new("p1", "demo", three_phases());
        meta.current_phase = 99;
        let summary = meta.summary();
        assert!(summary.starts_with("0/3 phases complete"));
    }
}
