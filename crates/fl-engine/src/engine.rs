//! The engine capability surface.
//!
//! Engines are stateless: a closed enum over the five supported
//! coding-agent CLIs. Per-workflow settings travel in [`EngineConfig`];
//! `Custom` is data-only (its behavior is entirely the configured
//! steps).

use anyhow::Result;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

static COPILOT_TOKENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total usage est:.*?([\d,]+) tokens").expect("valid regex"));
static CODEX_TOKENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tokens used:?\s*([\d,]+)").expect("valid regex"));
static GEMINI_TOKENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Prompt|Candidate) tokens:\s*([\d,]+)").expect("valid regex"));

use fl_config::EngineConfig;
use fl_core::EngineId;
use fl_emit::{YamlBuilder, render_step_value};

use crate::metrics::{LogMetrics, parse_token_count};

/// MCP configuration dialect an engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpDialect {
    /// JSON `{mcpServers: {...}}`, inlined into the engine invocation.
    Json,
    /// TOML `[mcp_servers.<name>]` tables.
    Toml,
    /// JSON plus one `.env` file per server.
    JsonEnv,
}

/// A coding-agent engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Claude,
    Copilot,
    Codex,
    Gemini,
    Custom,
}

impl Engine {
    pub fn from_id(id: EngineId) -> Self {
        match id {
            EngineId::Claude => Self::Claude,
            EngineId::Copilot => Self::Copilot,
            EngineId::Codex => Self::Codex,
            EngineId::Gemini => Self::Gemini,
            EngineId::Custom => Self::Custom,
        }
    }

    pub fn id(&self) -> EngineId {
        match self {
            Self::Claude => EngineId::Claude,
            Self::Copilot => EngineId::Copilot,
            Self::Codex => EngineId::Codex,
            Self::Gemini => EngineId::Gemini,
            Self::Custom => EngineId::Custom,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude Code",
            Self::Copilot => "GitHub Copilot CLI",
            Self::Codex => "OpenAI Codex CLI",
            Self::Gemini => "Gemini CLI",
            Self::Custom => "Custom engine",
        }
    }

    pub fn is_experimental(&self) -> bool {
        matches!(self, Self::Gemini)
    }

    /// Whether the engine enforces a per-server MCP tool allowlist.
    pub fn supports_tools_whitelist(&self) -> bool {
        matches!(self, Self::Claude | Self::Copilot)
    }

    /// Whether the engine can talk to HTTP MCP servers directly.
    pub fn supports_http_transport(&self) -> bool {
        matches!(self, Self::Claude | Self::Copilot)
    }

    pub fn mcp_dialect(&self) -> McpDialect {
        match self {
            Self::Codex => McpDialect::Toml,
            Self::Copilot => McpDialect::JsonEnv,
            Self::Claude | Self::Gemini | Self::Custom => McpDialect::Json,
        }
    }

    /// npm package and default version for npm-installed engines.
    pub fn npm_package(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Claude => Some(("@anthropic-ai/claude-code", "2.0.14")),
            Self::Copilot => Some(("@github/copilot", "0.0.354")),
            Self::Codex => Some(("@openai/codex", "0.46.0")),
            Self::Gemini => Some(("@google/gemini-cli", "0.8.2")),
            Self::Custom => None,
        }
    }

    /// Secrets that authenticate the engine. More than one entry means
    /// "any of these".
    pub fn secret_names(&self) -> &'static [&'static str] {
        match self {
            Self::Claude => &["ANTHROPIC_API_KEY", "CLAUDE_CODE_OAUTH_TOKEN"],
            Self::Copilot => &["COPILOT_CLI_TOKEN", "GH_AW_COPILOT_TOKEN"],
            Self::Codex => &["OPENAI_API_KEY"],
            Self::Gemini => &["GEMINI_API_KEY"],
            Self::Custom => &[],
        }
    }

    /// Secret validation plus npm installation, as final-coordinate
    /// step blocks. Custom engines install nothing.
    pub fn installation_steps(&self, config: &EngineConfig) -> Vec<String> {
        let Some((package, default_version)) = self.npm_package() else {
            return Vec::new();
        };
        let version = config.version.as_deref().unwrap_or(default_version);
        let mut steps = Vec::new();

        let secrets = self.secret_names();
        if !secrets.is_empty() {
            let mut b = YamlBuilder::new();
            b.line(6, &format!("- name: Validate {} secret", secrets[0]));
            b.line(8, "run: |");
            let check = secrets
                .iter()
                .map(|s| format!("[ -z \"${{{{ secrets.{s} }}}}\" ]"))
                .collect::<Vec<_>>()
                .join(" && ");
            b.line(10, &format!("if {check}; then"));
            b.line(
                10,
                &format!(
                    "  echo \"error: none of the required secrets ({}) are configured\" >&2",
                    secrets.join(", ")
                ),
            );
            b.line(10, "  exit 1");
            b.line(10, "fi");
            steps.push(b.finish().trim_end().to_string());
        }

        let mut b = YamlBuilder::new();
        b.line(6, &format!("- name: Install {}", self.display_name()));
        b.line(8, &format!("run: npm install -g {package}@{version}"));
        steps.push(b.finish().trim_end().to_string());
        steps
    }

    /// The engine invocation, as final-coordinate step blocks.
    ///
    /// `log_file` receives the full engine output for the log parser.
    pub fn execution_steps(&self, config: &EngineConfig, log_file: &str) -> Result<Vec<String>> {
        if let Self::Custom = self {
            let mut steps = Vec::with_capacity(config.steps.len());
            for step in &config.steps {
                steps.push(render_step_value(step)?);
            }
            return Ok(steps);
        }

        let mut b = YamlBuilder::new();
        b.line(6, &format!("- name: Run {}", self.display_name()));
        b.line(8, "id: agent_run");
        if !config.env.is_empty() || config.agent.is_some() {
            b.line(8, "env:");
            if let Some(agent) = &config.agent {
                b.line(10, &format!("GH_AW_AGENT_FILE: {agent}"));
            }
            for (key, value) in &config.env {
                b.line(10, &format!("{key}: {value}"));
            }
        }
        b.line(8, "run: |");
        b.line(10, "set -o pipefail");
        b.line(10, "INSTRUCTION=\"$(cat \"$GH_AW_PROMPT\")\"");
        if matches!(self, Self::Claude | Self::Codex) {
            // Prepend the agent file body (sans front matter) to the prompt.
            b.line(10, "if [ -n \"${GH_AW_AGENT_FILE:-}\" ]; then");
            b.line(
                10,
                "  INSTRUCTION=\"$(awk 'f||!/^---/{f=1; print}' \"$GH_AW_AGENT_FILE\"; printf '\\n%s' \"$INSTRUCTION\")\"",
            );
            b.line(10, "fi");
        }
        let invocation = self.invocation_line(config);
        b.line(10, &format!("{invocation} 2>&1 | tee {log_file}"));
        Ok(vec![b.finish().trim_end().to_string()])
    }

    fn invocation_line(&self, config: &EngineConfig) -> String {
        match self {
            Self::Claude => {
                let mut cmd = String::from(
                    "claude --print --output-format stream-json --verbose \
                     --dangerously-skip-permissions --mcp-config /tmp/gh-aw/mcp-config.json",
                );
                if let Some(model) = &config.model {
                    cmd.push_str(&format!(" --model {model}"));
                }
                cmd.push_str(" \"$INSTRUCTION\"");
                cmd
            }
            Self::Copilot => {
                let mut cmd = String::from(
                    "copilot --add-dir /tmp/gh-aw --log-level debug --allow-all-tools",
                );
                if let Some(model) = &config.model {
                    cmd.push_str(&format!(" --model {model}"));
                }
                if let Some(agent) = &config.agent {
                    cmd.push_str(&format!(" --agent {agent}"));
                }
                cmd.push_str(" --prompt \"$INSTRUCTION\"");
                cmd
            }
            Self::Codex => {
                let mut cmd = String::from(
                    "codex exec --full-auto --skip-git-repo-check -c mcp_config_path=/tmp/gh-aw/mcp-config.toml",
                );
                if let Some(model) = &config.model {
                    cmd.push_str(&format!(" -c model={model}"));
                }
                cmd.push_str(" \"$INSTRUCTION\"");
                cmd
            }
            Self::Gemini => {
                let mut cmd = String::from("gemini --yolo");
                if let Some(model) = &config.model {
                    cmd.push_str(&format!(" --model {model}"));
                }
                cmd.push_str(" --prompt \"$INSTRUCTION\"");
                cmd
            }
            Self::Custom => String::new(),
        }
    }

    /// Name of the embedded log-parser script for this engine.
    pub fn log_parser_script(&self) -> &'static str {
        match self {
            Self::Claude | Self::Custom => "parse_claude_log",
            Self::Copilot => "parse_copilot_log",
            Self::Codex => "parse_codex_log",
            Self::Gemini => "parse_gemini_log",
        }
    }

    /// Glob patterns matching this engine's log file names.
    pub fn filename_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Claude => &["claude-*.log", "*claude*.jsonl"],
            Self::Copilot => &["copilot-*.log"],
            Self::Codex => &["codex-*.log"],
            Self::Gemini => &["gemini-*.log"],
            Self::Custom => &["agent-*.log"],
        }
    }

    /// Confidence score that `log` was produced by this engine.
    pub fn detect_from_content(&self, log: &str) -> u32 {
        let markers: &[&str] = match self {
            Self::Claude => &["\"type\":\"assistant\"", "total_cost_usd", "num_turns"],
            Self::Copilot => &["Total usage est", "Premium requests", "copilot"],
            Self::Codex => &["tokens used", "OpenAI Codex", "codex"],
            Self::Gemini => &["Prompt tokens", "Candidate tokens", "gemini"],
            Self::Custom => &[],
        };
        markers
            .iter()
            .map(|m| log.matches(m).count() as u32)
            .sum()
    }

    /// Extract token usage, cost, turns, and error/warning counts.
    pub fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        let mut metrics = LogMetrics::default();
        match self {
            Self::Claude | Self::Custom => {
                for line in log.lines() {
                    let Ok(event) = serde_json::from_str::<JsonValue>(line) else {
                        metrics.count_line(line, verbose);
                        continue;
                    };
                    if event.get("type").and_then(JsonValue::as_str) == Some("result") {
                        metrics.estimated_cost = event
                            .get("total_cost_usd")
                            .and_then(JsonValue::as_f64)
                            .unwrap_or(0.0);
                        metrics.turns = event
                            .get("num_turns")
                            .and_then(JsonValue::as_u64)
                            .unwrap_or(0);
                    }
                    if let Some(usage) = event.pointer("/message/usage") {
                        metrics.token_usage += usage
                            .get("input_tokens")
                            .and_then(JsonValue::as_u64)
                            .unwrap_or(0);
                        metrics.token_usage += usage
                            .get("output_tokens")
                            .and_then(JsonValue::as_u64)
                            .unwrap_or(0);
                    }
                }
            }
            Self::Copilot => {
                for line in log.lines() {
                    if let Some(caps) = COPILOT_TOKENS_RE.captures(line) {
                        metrics.token_usage = parse_token_count(&caps[1]).unwrap_or(0);
                    } else {
                        metrics.count_line(line, verbose);
                    }
                }
            }
            Self::Codex => {
                for line in log.lines() {
                    if let Some(caps) = CODEX_TOKENS_RE.captures(line) {
                        metrics.token_usage = parse_token_count(&caps[1]).unwrap_or(0);
                    } else {
                        metrics.count_line(line, verbose);
                    }
                }
            }
            Self::Gemini => {
                for line in log.lines() {
                    if let Some(caps) = GEMINI_TOKENS_RE.captures(line) {
                        metrics.token_usage += parse_token_count(&caps[2]).unwrap_or(0);
                    } else {
                        metrics.count_line(line, verbose);
                    }
                }
            }
        }
        metrics
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
