//! Per-invocation request/response types for [`super::Agent::run`].

use crate::stream::StreamEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// The prompt source for one invocation: either inline text or a path to
/// a file already containing the prompt.
#[derive(Debug, Clone)]
pub enum Prompt {
    /// Inline prompt text.
    Text(String),
    /// Path to a file holding the prompt.
    File(PathBuf),
}

/// Per-invocation overrides layered on top of an agent's [`crate::config::AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    /// Prompt text or file, if this invocation overrides the configured
    /// template.
    pub prompt: Option<Prompt>,
    /// Model override.
    pub model: Option<String>,
    /// Effort-level override.
    pub effort: Option<String>,
    /// Tool allow-list override.
    pub allowed_tools: Option<String>,
    /// Output format selector (e.g. `"stream-json"`, `"text"`).
    pub output_format: Option<String>,
    /// Working directory for the child process.
    pub work_dir: Option<PathBuf>,
    /// Extra environment-variable bindings, applied last (last-writer-wins
    /// against both the inherited environment and the effort-level
    /// variable).
    pub env: HashMap<String, String>,
    /// Sink for streamed events. Streaming is only active when this is
    /// `Some` *and* `output_format == Some("stream-json")`.
    pub stream_events: Option<mpsc::Sender<StreamEvent>>,
}

impl RunOpts {
    /// Streaming is active iff a sink is set and the output format is
    /// exactly `"stream-json"`.
    pub fn streaming_active(&self) -> bool {
        self.stream_events.is_some() && self.output_format.as_deref() == Some("stream-json")
    }
}

/// The outcome of one subprocess invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code. A non-zero value is a data point, not an error.
    pub exit_code: i32,
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
    /// A rate-limit finding, if [`super::Agent::parse_rate_limit`] matched
    /// the combined stdout+stderr text.
    pub rate_limit: Option<RateLimitInfo>,
}

impl RunResult {
    /// `true` iff `exit_code == 0`.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A rate-limit finding extracted from an agent's output text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Whether the text matched a rate-limit trigger pattern.
    pub is_limited: bool,
    /// Extracted reset duration; zero when a trigger matched but no
    /// duration could be parsed out of the message.
    #[serde(with = "duration_secs")]
    pub reset_after: Duration,
    /// The original matched message text, preserved verbatim.
    pub message: String,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
