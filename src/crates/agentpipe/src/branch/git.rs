//! The Git facade the branch manager delegates to.

use crate::Result;
use async_trait::async_trait;

/// The minimal Git client interface the branch manager needs. External
/// callers may supply their own implementation; [`CliGitClient`] shells
/// out to the `git` binary.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// `true` iff `name` exists as a local branch.
    async fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Create `name` from `base` and leave it checked out, as `git
    /// checkout -b` does.
    async fn create_branch(&self, name: &str, base: &str) -> Result<()>;

    /// Check out an existing local branch.
    async fn checkout(&self, name: &str) -> Result<()>;

    /// Fetch from the named remote (empty string means the default
    /// remote). A missing remote is the caller's concern, not this
    /// trait's.
    async fn fetch(&self, remote: &str) -> Result<()>;
}

/// Shells out to the `git` binary, reusing the crate's subprocess-drain
/// contract (spawn, drain stdout/stderr concurrently, then wait).
pub struct CliGitClient {
    work_dir: std::path::PathBuf,
}

impl CliGitClient {
    /// A client that runs `git` with `work_dir` as its working directory.
    pub fn new(work_dir: impl Into<std::path::PathBuf>) -> Self {
        Self { work_dir: work_dir.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl GitClient for CliGitClient {
    async fn branch_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
            .await?;
        Ok(output.status.success())
    }

    async fn create_branch(&self, name: &str, base: &str) -> Result<()> {
        let args: Vec<&str> = if base.is_empty() {
            vec!["checkout", "-b", name]
        } else {
            vec!["checkout", "-b", name, base]
        };
        let output = self.run(&args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::AgentPipeError::BranchOpFailed(format!(
                "git checkout -b {name}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn checkout(&self, name: &str) -> Result<()> {
        let output = self.run(&["checkout", name]).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::AgentPipeError::BranchOpFailed(format!(
                "git checkout {name}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn fetch(&self, remote: &str) -> Result<()> {
        let args: Vec<&str> = if remote.is_empty() { vec!["fetch"] } else { vec!["fetch", remote] };
        let output = self.run(&args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::AgentPipeError::BranchOpFailed(format!(
                "git fetch: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
