//! The canonical per-phase workflow graph and its skip-flag rewrite.
//!
//! Modeled after a named-step, event-keyed transition graph: each
//! [`Step`] has a default `on_success` transition and a map of other
//! named events to their target step. The transform never mutates the
//! definition it is given; it always returns a fresh graph.

use crate::config::PipelineOpts;
use std::collections::HashMap;

/// Terminal pseudo-step a rewritten graph transitions into when a
/// branch has nothing left to run.
pub const TERMINAL_STEP: &str = "__done__";

pub const STEP_RUN_IMPLEMENT: &str = "run_implement";
pub const STEP_RUN_REVIEW: &str = "run_review";
pub const STEP_CHECK_REVIEW: &str = "check_review";
pub const STEP_RUN_FIX: &str = "run_fix";
pub const STEP_CREATE_PR: &str = "create_pr";

const NEEDS_HUMAN_EVENT: &str = "needs_human";

/// One named step in a workflow graph.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    /// Transition taken on the step's ordinary success outcome.
    pub on_success: Option<String>,
    /// Transitions keyed by any other named event the step can emit.
    pub on_event: HashMap<String, String>,
}

impl Step {
    fn new(name: &str, on_success: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            on_success: on_success.map(str::to_string),
            on_event: HashMap::new(),
        }
    }

    fn with_event(mut self, event: &str, target: &str) -> Self {
        self.on_event.insert(event.to_string(), target.to_string());
        self
    }
}

/// A named-step, event-keyed workflow graph. `steps` intentionally
/// omits the terminal pseudo-step; reaching [`TERMINAL_STEP`] ends the
/// phase.
#[derive(Debug, Clone)]
pub struct WorkflowDef {
    pub initial_step: String,
    pub steps: HashMap<String, Step>,
}

impl WorkflowDef {
    /// The canonical implement -> review -> fix -> PR graph every phase
    /// starts from before skip-flag pruning.
    pub fn canonical() -> Self {
        let mut steps = HashMap::new();
        steps.insert(STEP_RUN_IMPLEMENT.to_string(), Step::new(STEP_RUN_IMPLEMENT, Some(STEP_RUN_REVIEW)));
        steps.insert(STEP_RUN_REVIEW.to_string(), Step::new(STEP_RUN_REVIEW, Some(STEP_CHECK_REVIEW)));
        steps.insert(
            STEP_CHECK_REVIEW.to_string(),
            Step::new(STEP_CHECK_REVIEW, Some(STEP_CREATE_PR))
                .with_event("changes_needed", STEP_RUN_FIX)
                .with_event(NEEDS_HUMAN_EVENT, STEP_RUN_FIX),
        );
        steps.insert(STEP_RUN_FIX.to_string(), Step::new(STEP_RUN_FIX, Some(STEP_RUN_REVIEW)));
        steps.insert(STEP_CREATE_PR.to_string(), Step::new(STEP_CREATE_PR, Some(TERMINAL_STEP)));

        Self {
            initial_step: STEP_RUN_IMPLEMENT.to_string(),
            steps,
        }
    }

    /// `true` iff this graph's initial step is the terminal pseudo-step
    /// — a valid no-op phase that should short-circuit without invoking
    /// the engine.
    pub fn is_empty(&self) -> bool {
        self.initial_step == TERMINAL_STEP
    }

    /// Every active step name, in a deterministic order matching the
    /// canonical implement -> review -> fix -> PR sequence.
    pub fn active_steps(&self) -> Vec<String> {
        [STEP_RUN_IMPLEMENT, STEP_RUN_REVIEW, STEP_CHECK_REVIEW, STEP_RUN_FIX, STEP_CREATE_PR]
            .iter()
            .filter(|name| self.steps.contains_key(**name))
            .map(|name| name.to_string())
            .collect()
    }

    fn rewire_to(&mut self, old_target: &str, new_target: &str) {
        for step in self.steps.values_mut() {
            if step.on_success.as_deref() == Some(old_target) {
                step.on_success = Some(new_target.to_string());
            }
            for target in step.on_event.values_mut() {
                if target == old_target {
                    *target = new_target.to_string();
                }
            }
        }
        if self.initial_step == old_target {
            self.initial_step = new_target.to_string();
        }
    }
}

/// Apply `opts`'s skip flags to `canonical`, returning a new graph. The
/// input is never mutated.
pub fn apply_skip_flags(canonical: &WorkflowDef, opts: &PipelineOpts) -> WorkflowDef {
    let mut def = canonical.clone();

    if opts.skip_implement {
        def.steps.remove(STEP_RUN_IMPLEMENT);
        if def.initial_step == STEP_RUN_IMPLEMENT {
            def.initial_step = STEP_RUN_REVIEW.to_string();
        }
    }

    if opts.skip_review {
        def.steps.remove(STEP_RUN_REVIEW);
        def.steps.remove(STEP_CHECK_REVIEW);
        def.steps.remove(STEP_RUN_FIX);

        if let Some(implement) = def.steps.get_mut(STEP_RUN_IMPLEMENT) {
            implement.on_success = Some(STEP_CREATE_PR.to_string());
        } else if def.initial_step != STEP_CREATE_PR {
            def.initial_step = STEP_CREATE_PR.to_string();
        }
    }

    if opts.skip_fix && !opts.skip_review {
        def.steps.remove(STEP_RUN_FIX);
        if let Some(check) = def.steps.get_mut(STEP_CHECK_REVIEW) {
            check.on_event.insert(NEEDS_HUMAN_EVENT.to_string(), STEP_CREATE_PR.to_string());
        }
    }

    if opts.skip_pr {
        def.steps.remove(STEP_CREATE_PR);
        def.rewire_to(STEP_CREATE_PR, TERMINAL_STEP);
    }

    def
}
