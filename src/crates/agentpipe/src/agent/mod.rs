//! Agent adapters: the uniform `Agent` contract plus one implementation
//! per supported CLI, shared subprocess-execution machinery, and the
//! registry that the pipeline orchestrator looks agents up by name in.

mod adapter;
mod claude;
mod codex;
mod gemini;
mod mock;
mod process;
mod rate_patterns;
mod registry;
mod types;

pub use adapter::Agent;
pub use claude::ClaudeAgent;
pub use codex::CodexAgent;
pub use gemini::GeminiAgent;
pub use mock::MockAgent;
pub use process::{ProcessSpec, PromptArg};
pub use rate_patterns::{detect_claude, detect_codex};
pub use registry::AgentRegistry;
pub use types::{Prompt, RateLimitInfo, RunOpts, RunResult};
