//! Phase definitions and per-run options.

use serde::{Deserialize, Serialize};

/// One numbered, named span of the project, loaded from an external
/// phase source (see [`crate::pipeline::phase_source`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Numeric phase id. Compared strictly numerically by
    /// [`PhaseSelector::From`].
    pub id: u64,
    /// Human-readable phase name, also used to derive the branch slug.
    pub name: String,
    /// Identifier of the first task in this phase's span.
    pub start_task: String,
    /// Identifier of the last task in this phase's span.
    pub end_task: String,
}

/// Which phases a run should cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseSelector {
    /// Every configured phase, in order.
    #[default]
    All,
    /// Exactly one phase, by id.
    Single(u64),
    /// Every phase whose id is `>= id`, in order.
    From(u64),
}

impl PhaseSelector {
    /// Apply the selector to an ordered phase list.
    ///
    /// `Single` errors (via `None`) when the id is absent; `From` errors
    /// when the filtered result is empty. `All` never errors.
    pub fn resolve(&self, phases: &[Phase]) -> Option<Vec<Phase>> {
        match self {
            PhaseSelector::All => Some(phases.to_vec()),
            PhaseSelector::Single(id) => phases
                .iter()
                .find(|p| p.id == *id)
                .cloned()
                .map(|p| vec![p]),
            PhaseSelector::From(id) => {
                let selected: Vec<Phase> =
                    phases.iter().filter(|p| p.id >= *id).cloned().collect();
                if selected.is_empty() {
                    None
                } else {
                    Some(selected)
                }
            }
        }
    }
}

/// Per-invocation pipeline options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOpts {
    /// Which phases to run.
    #[serde(default)]
    pub phase_selector: PhaseSelector,

    /// Elide the implement step from every phase's workflow.
    #[serde(default)]
    pub skip_implement: bool,
    /// Elide the review step (and its dependents) from every phase's
    /// workflow.
    #[serde(default)]
    pub skip_review: bool,
    /// Elide the fix step from every phase's workflow.
    #[serde(default)]
    pub skip_fix: bool,
    /// Elide the PR-creation step from every phase's workflow.
    #[serde(default)]
    pub skip_pr: bool,

    /// Agent used for the implement step. Unknown/empty names are
    /// silently replaced by the default agent at resolution time.
    #[serde(default)]
    pub impl_agent: String,
    /// Agent used for the review step.
    #[serde(default)]
    pub review_agent: String,
    /// Agent used for the fix step.
    #[serde(default)]
    pub fix_agent: String,

    /// Number of concurrent review agents the per-phase engine may fan
    /// out to.
    #[serde(default = "default_review_concurrency")]
    pub review_concurrency: u32,
    /// Ceiling on review -> fix cycles within a single phase.
    #[serde(default = "default_max_review_cycles")]
    pub max_review_cycles: u32,

    /// When true, no mutating action is taken; only a plan is produced.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_review_concurrency() -> u32 {
    1
}

fn default_max_review_cycles() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases() -> Vec<Phase> {
        vec![
            Phase { id: 1, name: "Foundation".into(), start_task: "t1".into(), end_task: "t2".into() },
            Phase { id: 2, name: "Implementation".into(), start_task: "t3".into(), end_task: "t4".into() },
            Phase { id: 3, name: "Integration & Testing".into(), start_task: "t5".into(), end_task: "t6".into() },
        ]
    }

    #[test]
    fn all_returns_every_phase_in_order() {
        let resolved = PhaseSelector::All.resolve(&phases()).unwrap();
        assert_eq!(resolved.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn single_finds_one_phase() {
        let resolved = PhaseSelector::Single(2).resolve(&phases()).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Implementation");
    }

    #[test]
    fn single_missing_id_is_none() {
        assert!(PhaseSelector::Single(99).resolve(&phases()).is_none());
    }

    #[test]
    fn from_is_strict_numeric_gte() {
        let resolved = PhaseSelector::From(2).resolve(&phases()).unwrap();
        assert_eq!(resolved.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn from_beyond_all_ids_is_none() {
        assert!(PhaseSelector::From(100).resolve(&phases()).is_none());
    }

    #[test]
    fn from_accepts_non_contiguous_ids() {
        let phases = vec![
            Phase { id: 1, name: "a".into(), start_task: "s".into(), end_task: "e".into() },
            Phase { id: 10, name: "b".into(), start_task: "s".into(), end_task: "e".into() },
        ];
        let resolved = PhaseSelector::From(5).resolve(&phases).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, 10);
    }
}
