//! Execution substrate for a phase-based, agent-driven software pipeline.
//!
//! `agentpipe` drives external AI coding agent CLIs (Claude, Codex, Gemini,
//! ...) through a deterministic implement -> review -> fix -> PR lifecycle
//! across a sequence of configured project phases. Each phase runs on its
//! own isolated Git branch and is checkpointed so a crashed or cancelled
//! run can resume without repeating completed work.
//!
//! The crate is organized leaves-first:
//!
//! - [`stream`] parses an agent's line-delimited JSON event stream.
//! - [`agent`] spawns agent subprocesses and exposes a uniform contract.
//! - [`ratelimit`] coordinates cross-provider rate-limit backoff.
//! - [`branch`] derives and materializes per-phase Git branches.
//! - [`pipeline`] sequences phases, applies skip-flag rewrites, and
//!   persists resumable checkpoints.

pub mod agent;
pub mod branch;
pub mod cancel;
pub mod config;
pub mod pipeline;
pub mod ratelimit;
pub mod stream;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};

use thiserror::Error;

/// Errors raised anywhere in the pipeline execution substrate.
///
/// Each variant corresponds to one "Kind" row in the error-handling design:
/// callers can match on the variant to distinguish recoverable conditions
/// (already absorbed and logged before this type is ever constructed) from
/// conditions they must act on.
#[derive(Debug, Error)]
pub enum AgentPipeError {
    /// An agent name failed validation or was empty.
    #[error("invalid agent name: {0}")]
    InvalidName(String),

    /// A name was registered twice in the same [`agent::AgentRegistry`].
    #[error("agent already registered: {0}")]
    DuplicateName(String),

    /// A lookup (agent, phase, ...) found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A capability is intentionally unimplemented (stub adapters).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The agent subprocess could not be started.
    #[error("starting {agent}: {source}")]
    StartFailed {
        /// Name of the adapter that failed to start.
        agent: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// [`ratelimit::RateLimitCoordinator::wait_for_reset`] saw
    /// `wait_count >= max_waits` (or `max_waits == 0`).
    #[error("rate limit max waits exceeded for provider {0}")]
    RateLimitMaxExceeded(String),

    /// An ambient cancellation signal fired during a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// [`branch::BranchManager::switch_to_phase_branch`] targeted a branch
    /// that does not exist locally.
    #[error("branch manager: branch does not exist: {0}")]
    BranchNotExists(String),

    /// A Git operation failed.
    #[error("branch manager: {0}")]
    BranchOpFailed(String),

    /// The orchestrator could not resolve a phase list from configuration.
    #[error("resolve failed: {0}")]
    ResolveFailed(String),

    /// Decoding the agent's stream failed (oversized line, I/O failure).
    #[error("stream decode failed: {0}")]
    StreamDecode(String),

    /// Wraps a lower-level I/O failure not covered by a more specific
    /// variant above.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wraps a JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentPipeError>;
