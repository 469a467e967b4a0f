//! Deterministic, template-driven phase-branch creation.

use super::git::GitClient;
use crate::{AgentPipeError, Result};
use std::sync::Arc;
use tracing::warn;

/// Default branch-name template when none is configured.
pub const DEFAULT_BRANCH_PATTERN: &str = "phase/{phase_id}-{slug}";

/// Inputs to [`BranchManager::create_phase_branch`] and
/// [`BranchManager::ensure_branch`].
#[derive(Debug, Clone)]
pub struct PhaseBranchOpts {
    pub phase_id: u64,
    pub phase_name: String,
    pub project_name: String,
    /// Branch to base on; empty means fall back to `base_branch`.
    pub previous_phase_branch: String,
    pub base_branch: String,
    pub sync_base: bool,
}

/// Façade over a [`GitClient`] that derives and materializes per-phase
/// branches from a configured name template.
pub struct BranchManager {
    git: Option<Arc<dyn GitClient>>,
    pattern: String,
}

impl BranchManager {
    /// Build a manager with no Git client configured; all operations
    /// that need one are the caller's responsibility to skip.
    pub fn new(git: Option<Arc<dyn GitClient>>, pattern: Option<String>) -> Self {
        Self {
            git,
            pattern: pattern.unwrap_or_else(|| DEFAULT_BRANCH_PATTERN.to_string()),
        }
    }

    /// `true` iff a [`GitClient`] was configured.
    pub fn has_git_client(&self) -> bool {
        self.git.is_some()
    }

    /// Apply template substitution: `{phase_id}`, `{slug}`, `{project}`.
    /// Missing variables are replaced with empty strings; this function
    /// never fails.
    pub fn resolve_branch_name(&self, phase_id: u64, phase_name: &str, project_name: &str) -> String {
        let slug = slugify(phase_name);
        self.pattern
            .replace("{phase_id}", &phase_id.to_string())
            .replace("{slug}", &slug)
            .replace("{project}", project_name)
    }

    /// Create a phase branch: base is `previous_phase_branch` if
    /// non-empty, else `base_branch`. Fetches the base first when
    /// `sync_base` is set; a fetch failure is a warning, not an error.
    pub async fn create_phase_branch(&self, opts: &PhaseBranchOpts) -> Result<String> {
        let git = self.require_git()?;
        let resolved = self.resolve_branch_name(opts.phase_id, &opts.phase_name, &opts.project_name);
        let base = if !opts.previous_phase_branch.is_empty() {
            opts.previous_phase_branch.as_str()
        } else {
            opts.base_branch.as_str()
        };

        if opts.sync_base {
            if let Err(e) = git.fetch("").await {
                warn!(error = %e, "branch manager: sync_base fetch failed, continuing");
            }
        }

        git.create_branch(&resolved, base)
            .await
            .map_err(|e| wrap(format!("{e}")))?;
        Ok(resolved)
    }

    /// Check out `name`. Errors distinctly when the branch does not
    /// exist locally.
    pub async fn switch_to_phase_branch(&self, name: &str) -> Result<()> {
        let git = self.require_git()?;
        if !git.branch_exists(name).await.map_err(|e| wrap(format!("{e}")))? {
            return Err(AgentPipeError::BranchNotExists(name.to_string()));
        }
        git.checkout(name).await.map_err(|e| wrap(format!("{e}")))
    }

    /// Idempotent: checkout if the resolved branch exists, else create
    /// it. Returns the resolved name either way.
    pub async fn ensure_branch(&self, opts: &PhaseBranchOpts) -> Result<String> {
        let git = self.require_git()?;
        let resolved = self.resolve_branch_name(opts.phase_id, &opts.phase_name, &opts.project_name);

        if git.branch_exists(&resolved).await.map_err(|e| wrap(format!("{e}")))? {
            git.checkout(&resolved).await.map_err(|e| wrap(format!("{e}")))?;
            Ok(resolved)
        } else {
            self.create_phase_branch(opts).await
        }
    }

    fn require_git(&self) -> Result<&Arc<dyn GitClient>> {
        self.git.as_ref().ok_or_else(|| wrap("no git client configured".to_string()))
    }
}

fn wrap(message: String) -> AgentPipeError {
    AgentPipeError::BranchOpFailed(message)
}

/// Lowercase, collapse runs of non-ASCII-alphanumerics to a single
/// hyphen, then trim leading/trailing hyphens.
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut last_was_hyphen = false;

    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }

    out.trim_matches('-').to_string()
}
