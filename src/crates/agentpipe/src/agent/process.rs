//! Shared subprocess-execution contract used by every concrete [`super::Agent`].
//!
//! Every variant builds its own argument vector and environment, then
//! hands both to [`execute`], which owns: spawning, concurrent stdout/
//! stderr draining (started before the process is waited on, to avoid the
//! classic pipe-buffer deadlock), optional non-blocking stream-event
//! tee-ing, process-group cancellation on POSIX, and rate-limit detection
//! over the combined output.

use super::types::{Prompt, RateLimitInfo, RunOpts, RunResult};
use crate::cancel::CancelToken;
use crate::stream::StreamEvent;
use crate::{AgentPipeError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Grace period after a cancel-triggered kill before pipes are force-closed.
const KILL_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Everything a variant needs to say about how to invoke its binary; the
/// mechanics of running it are identical across variants.
pub struct ProcessSpec {
    /// Adapter name, used only to prefix error messages ("starting claude").
    pub adapter_name: String,
    /// Resolved executable (configured command, or variant default).
    pub program: String,
    /// Full argument vector, already shaped per the variant's rules.
    pub args: Vec<String>,
    /// Extra environment bindings layered over the inherited environment,
    /// in order: effort-level variable (if applicable) first, then
    /// `opts.env`, last-writer-wins.
    pub env: Vec<(String, String)>,
}

/// Run `spec` to completion (or until `cancel` fires) and return the
/// captured result. `parse_rate_limit` is the variant's own detector,
/// applied to the combined stdout+stderr text.
pub async fn execute(
    spec: ProcessSpec,
    opts: &RunOpts,
    cancel: &CancelToken,
    parse_rate_limit: impl Fn(&str) -> Option<RateLimitInfo>,
) -> Result<RunResult> {
    let start = Instant::now();

    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    if let Some(dir) = &opts.work_dir {
        command.current_dir(dir);
    }

    for (key, value) in &spec.env {
        command.env(key, value);
    }

    place_in_own_process_group(&mut command);

    let mut child = command.spawn().map_err(|e| {
        debug!(adapter = %spec.adapter_name, error = %e, "failed to start agent subprocess");
        AgentPipeError::StartFailed {
            agent: spec.adapter_name.clone(),
            source: e,
        }
    })?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let streaming = opts.streaming_active();
    let stdout_sink = opts.stream_events.clone();

    let stdout_task = tokio::spawn(drain_stdout(stdout, streaming, stdout_sink));
    let stderr_task = tokio::spawn(drain_stderr(stderr));

    let wait_result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            kill_process_group(&mut child).await;
            None
        }
        status = child.wait() => Some(status),
    };

    let (stdout_buf, stderr_buf) = (
        stdout_task.await.unwrap_or_default(),
        stderr_task.await.unwrap_or_default(),
    );

    let exit_code = match wait_result {
        Some(Ok(status)) => status.code().unwrap_or(-1),
        Some(Err(e)) => return Err(AgentPipeError::Io(e)),
        None => return Err(AgentPipeError::Cancelled),
    };

    let combined = format!("{stdout_buf}\n{stderr_buf}");
    let rate_limit = parse_rate_limit(&combined);

    Ok(RunResult {
        stdout: stdout_buf,
        stderr: stderr_buf,
        exit_code,
        duration: start.elapsed(),
        rate_limit,
    })
}

async fn drain_stdout(
    stdout: tokio::process::ChildStdout,
    streaming: bool,
    sink: Option<mpsc::Sender<StreamEvent>>,
) -> String {
    if let (true, Some(sink)) = (streaming, sink) {
        // Tee: one path feeds a StreamDecoder, the other fills the result
        // buffer. We reuse the crate's own decode() for the parse path by
        // running it over a line-teeing reader.
        tee_stdout(stdout, sink).await
    } else {
        let mut buf = String::new();
        let mut reader = BufReader::new(stdout);
        let _ = reader.read_to_string(&mut buf).await;
        buf
    }
}

/// Read stdout line by line, forwarding each parsed [`StreamEvent`] to
/// `sink` with a non-blocking send (dropped on back-pressure) while also
/// accumulating the raw bytes for [`RunResult::stdout`].
async fn tee_stdout(stdout: tokio::process::ChildStdout, sink: mpsc::Sender<StreamEvent>) -> String {
    let mut lines = BufReader::new(stdout).lines();
    let mut buf = String::new();

    while let Ok(Some(line)) = lines.next_line().await {
        buf.push_str(&line);
        buf.push('\n');

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<StreamEvent>(trimmed) {
            Ok(event) => {
                if sink.try_send(event).is_err() {
                    debug!("dropped stream event under back-pressure or closed sink");
                }
            }
            Err(e) => debug!(error = %e, "skipping malformed stream line"),
        }
    }

    buf
}

async fn drain_stderr(stderr: tokio::process::ChildStderr) -> String {
    let mut buf = String::new();
    let mut reader = BufReader::new(stderr);
    let _ = reader.read_to_string(&mut buf).await;
    buf
}

#[cfg(unix)]
fn place_in_own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn place_in_own_process_group(_command: &mut Command) {}

#[cfg(unix)]
async fn kill_process_group(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        // SAFETY: killpg with a valid, still-tracked pid is a plain syscall;
        // the process group was created at spawn time via process_group(0).
        unsafe {
            libc::killpg(pid as i32, libc::SIGTERM);
        }
    }

    let graceful = tokio::time::timeout(KILL_GRACE_PERIOD, child.wait()).await;
    if graceful.is_err() {
        warn!("agent subprocess did not exit within grace period, force-killing");
        if let Some(pid) = child.id() {
            unsafe {
                libc::killpg(pid as i32, libc::SIGKILL);
            }
        }
        let _ = child.wait().await;
    }
}

#[cfg(not(unix))]
async fn kill_process_group(child: &mut tokio::process::Child) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}

/// Build the `program`/`args` environment from the current process
/// environment, an optional effort-level variable, and caller overrides
/// (last-writer-wins, `opts.env` applied last).
pub fn build_env(effort_var: Option<(&str, &str)>, opts_env: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut env = Vec::new();
    if let Some((key, value)) = effort_var {
        if !value.is_empty() {
            env.push((key.to_string(), value.to_string()));
        }
    }
    for (k, v) in opts_env {
        env.retain(|(existing_key, _)| existing_key != k);
        env.push((k.clone(), v.clone()));
    }
    env
}

/// Prompts above this size are spilled to a temp file and passed by path
/// instead of as a literal argument, to stay clear of platform `ARG_MAX`.
const LARGE_PROMPT_THRESHOLD: usize = 100 * 1024;

/// Which flag a materialized prompt should be passed under.
pub enum PromptArg {
    /// `--prompt <text>`.
    Inline(String),
    /// `--prompt-file <path>`.
    File(String),
}

/// Resolve how to place `prompt` on the command line: the configured
/// file path verbatim for [`Prompt::File`], inline text for a short
/// [`Prompt::Text`], or a freshly written temp file's path for long
/// text. A write failure for the large-prompt case falls back to
/// inline rather than failing the run. The temp file is intentionally
/// left on disk; the adapter that ran the prompt has no further use for
/// it, and cleanup is the same deliberate non-goal the CLI it mirrors
/// leaves in place.
pub fn materialize_prompt(prompt: &Prompt) -> PromptArg {
    match prompt {
        Prompt::File(path) => PromptArg::File(path.display().to_string()),
        Prompt::Text(text) if text.len() <= LARGE_PROMPT_THRESHOLD => PromptArg::Inline(text.clone()),
        Prompt::Text(text) => spill_to_temp_file(text).unwrap_or_else(|_| PromptArg::Inline(text.clone())),
    }
}

fn spill_to_temp_file(text: &str) -> std::io::Result<PromptArg> {
    let mut file = tempfile::Builder::new().prefix("agentpipe-prompt-").suffix(".txt").tempfile()?;
    std::io::Write::write_all(&mut file, text.as_bytes())?;
    let path = file.into_temp_path().keep().map_err(|e| e.error)?;
    Ok(PromptArg::File(path.display().to_string()))
}

/// Resolve which command to run: the configured override, or the
/// variant's default binary name.
pub fn resolve_command(configured: &Option<String>, default_binary: &str) -> String {
    configured.clone().unwrap_or_else(|| default_binary.to_string())
}

/// Verify `binary` is reachable on `PATH`.
pub async fn check_on_path(binary: &str, install_hint_url: &str) -> Result<()> {
    let found = tokio::task::spawn_blocking({
        let binary = binary.to_string();
        move || which(&binary)
    })
    .await
    .unwrap_or(false);

    if found {
        Ok(())
    } else {
        Err(AgentPipeError::NotFound(format!(
            "executable '{binary}' not found on PATH; install it from {install_hint_url}"
        )))
    }
}

fn which(binary: &str) -> bool {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return PathBuf::from(binary).is_file();
    }
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| dir.join(binary).is_file())
}

/// Truncate displayed prompt text to 120 characters (runes), appending
/// `"..."` when truncated, independent of output format.
pub fn truncate_prompt_for_display(text: &str) -> String {
    let char_count = text.chars().count();
    if char_count <= 120 {
        return text.to_string();
    }
    let truncated: String = text.chars().take(120).collect();
    format!("{truncated}...")
}
