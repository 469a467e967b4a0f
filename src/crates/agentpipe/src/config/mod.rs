//! Externally-supplied configuration records.
//!
//! These are plain, serde-derived data — loading them from Markdown/TOML
//! files is outside this crate's scope; callers build them however they
//! like and hand them to the rest of the crate.

mod agent;
mod backoff;
mod phase;

pub use agent::{AgentConfig, AgentIdentity};
pub use backoff::BackoffConfig;
pub use phase::{Phase, PhaseSelector, PipelineOpts};
