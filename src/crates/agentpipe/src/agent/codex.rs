//! Codex CLI adapter.

use super::adapter::Agent;
use super::process::{
    build_env, check_on_path, execute, materialize_prompt, resolve_command, truncate_prompt_for_display, ProcessSpec,
    PromptArg,
};
use super::rate_patterns::detect_codex;
use super::types::{Prompt, RateLimitInfo, RunOpts, RunResult};
use crate::cancel::CancelToken;
use crate::config::AgentConfig;
use crate::Result;
use async_trait::async_trait;

const DEFAULT_BINARY: &str = "codex";
const INSTALL_HINT: &str = "https://github.com/openai/codex";

/// Adapter for the `codex` CLI. Always invoked as `exec --sandbox
/// --ephemeral -a never`; unlike [`super::claude::ClaudeAgent`] it never
/// emits `--permission-mode`, `--print`, `--allowedTools`,
/// `--output-format`, and never sets an effort environment variable.
pub struct CodexAgent {
    name: String,
    config: AgentConfig,
}

impl CodexAgent {
    pub fn new(name: impl Into<String>, config: AgentConfig) -> Self {
        Self { name: name.into(), config }
    }

    fn base_args(&self, opts: &RunOpts) -> Vec<String> {
        let mut args = vec![
            "exec".to_string(),
            "--sandbox".to_string(),
            "--ephemeral".to_string(),
            "-a".to_string(),
            "never".to_string(),
        ];

        if let Some(model) = opts.model.as_ref().or(self.config.model.as_ref()) {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        args
    }

    fn build_args(&self, opts: &RunOpts) -> Vec<String> {
        let mut args = self.base_args(opts);
        if let Some(prompt) = &opts.prompt {
            match materialize_prompt(prompt) {
                PromptArg::Inline(text) => {
                    args.push("--prompt".to_string());
                    args.push(text);
                }
                PromptArg::File(path) => {
                    args.push("--prompt-file".to_string());
                    args.push(path);
                }
            }
        }
        args
    }

    fn build_args_for_display(&self, opts: &RunOpts) -> Vec<String> {
        let mut args = self.base_args(opts);
        match &opts.prompt {
            Some(Prompt::File(path)) => {
                args.push("--prompt-file".to_string());
                args.push(path.display().to_string());
            }
            Some(Prompt::Text(text)) => {
                args.push("--prompt".to_string());
                args.push(truncate_prompt_for_display(text));
            }
            None => {}
        }
        args
    }
}

#[async_trait]
impl Agent for CodexAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_prerequisites(&self) -> Result<()> {
        let binary = resolve_command(&self.config.command, DEFAULT_BINARY);
        check_on_path(&binary, INSTALL_HINT).await
    }

    async fn run(&self, opts: &RunOpts, cancel: &CancelToken) -> Result<RunResult> {
        let args = self.build_args(opts);
        let env = build_env(None, &opts.env);

        let spec = ProcessSpec {
            adapter_name: self.name.clone(),
            program: resolve_command(&self.config.command, DEFAULT_BINARY),
            args,
            env,
        };

        execute(spec, opts, cancel, detect_codex).await
    }

    fn parse_rate_limit(&self, text: &str) -> Option<RateLimitInfo> {
        detect_codex(text)
    }

    fn dry_run_command(&self, opts: &RunOpts) -> String {
        let args = self.build_args_for_display(opts);
        let program = resolve_command(&self.config.command, DEFAULT_BINARY);
        format!("{program} {}", args.join(" "))
    }
}
