//! Top-level front-matter parsing into [`WorkflowSpec`].

use anyhow::{Result, bail};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::warn;

use fl_frontmatter::{WorkflowSource, WorkflowSteps, parse_steps_from_frontmatter};

use crate::engine::{EngineConfig, parse_engine};
use crate::mcp::{McpServerConfig, parse_mcp_server};
use crate::network::{NetworkPermissions, parse_network};
use crate::numeric::as_u64;
use crate::reaction::{AiReaction, parse_reaction};
use crate::safe_outputs::{SafeOutputsConfig, parse_safe_outputs};
use crate::sandbox::{SandboxConfig, parse_sandbox};
use crate::tools::{ToolsConfig, parse_tools};

/// Default roles allowed to trigger a workflow.
const DEFAULT_ROLES: &[&str] = &["admin", "maintainer", "write"];

/// The normalized, fully-resolved workflow definition.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    pub name: String,
    pub description: Option<String>,
    /// Command trigger name (`/name` in comments), when alias-triggered.
    pub command: Option<String>,
    pub campaign: Option<String>,
    pub fingerprint: Option<String>,
    /// Trigger block, kept verbatim for emission.
    pub on: Value,
    /// Permissions block, kept verbatim for emission.
    pub permissions: Value,
    /// User concurrency override; derived by policy when absent.
    pub concurrency: Option<String>,
    pub tools: ToolsConfig,
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
    pub engine: EngineConfig,
    pub safe_outputs: Option<SafeOutputsConfig>,
    pub network: NetworkPermissions,
    /// Whether `network:` was written out (strict mode requires it).
    pub network_declared: bool,
    pub roles: Vec<String>,
    pub reaction: AiReaction,
    pub sandbox: SandboxConfig,
    pub custom_steps: WorkflowSteps,
    /// Markdown body used as the agent prompt.
    pub markdown: String,
    pub safety_prompt: bool,
    pub strict: bool,
    pub timeout_minutes: Option<u64>,
    /// Top-level keys the parser did not recognize (strict mode rejects).
    pub unknown_keys: Vec<String>,
}

impl WorkflowSpec {
    pub fn has_command_trigger(&self) -> bool {
        self.command.is_some()
    }

    pub fn has_pull_request_trigger(&self) -> bool {
        trigger_names(&self.on)
            .iter()
            .any(|t| t == "pull_request" || t == "pull_request_target")
    }

    pub fn has_issue_trigger(&self) -> bool {
        trigger_names(&self.on)
            .iter()
            .any(|t| t == "issues" || t == "issue_comment")
    }

    /// True when the permissions block grants `level` on `scope`.
    pub fn permissions_allow(&self, scope: &str, level: &str) -> bool {
        match &self.permissions {
            Value::String(s) => {
                s == &format!("{level}-all") || (level == "read" && s == "write-all")
            }
            Value::Mapping(map) => match map.get(scope).and_then(|v| v.as_str()) {
                Some(granted) => granted == level || (level == "read" && granted == "write"),
                None => false,
            },
            _ => false,
        }
    }

    /// All MCP servers: the dedicated map plus `tools:`-declared ones.
    pub fn all_mcp_servers(&self) -> BTreeMap<String, McpServerConfig> {
        let mut servers = self.mcp_servers.clone();
        for (name, server) in &self.tools.custom_servers {
            servers.entry(name.clone()).or_insert_with(|| server.clone());
        }
        servers
    }
}

/// Names of the triggers in the `on:` block.
pub fn trigger_names(on: &Value) -> Vec<String> {
    match on {
        Value::String(s) => vec![s.clone()],
        Value::Sequence(seq) => seq
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Value::Mapping(map) => map
            .keys()
            .filter_map(|k| k.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse resolved front matter into a [`WorkflowSpec`].
///
/// `default_name` (the source file stem) applies when `name:` is absent.
pub fn parse_workflow(src: &WorkflowSource, default_name: &str) -> Result<WorkflowSpec> {
    let fm = &src.frontmatter;

    let command = get_str(fm, "command");
    let on = match fm.get("on") {
        Some(v) => v.clone(),
        None => default_triggers(command.is_some()),
    };

    let timeout_minutes = parse_timeout(fm)?;

    let mut spec = WorkflowSpec {
        name: get_str(fm, "name").unwrap_or_else(|| default_name.to_string()),
        description: get_str(fm, "description"),
        command,
        campaign: get_str(fm, "campaign"),
        fingerprint: get_str(fm, "fingerprint"),
        on,
        permissions: fm
            .get("permissions")
            .cloned()
            .unwrap_or(Value::Mapping(Mapping::new())),
        concurrency: get_str(fm, "concurrency"),
        tools: match fm.get("tools") {
            Some(v) => parse_tools(v)?,
            None => ToolsConfig::default(),
        },
        mcp_servers: parse_mcp_servers(fm)?,
        engine: match fm.get("engine") {
            Some(v) => parse_engine(v)?,
            None => EngineConfig::default(),
        },
        safe_outputs: match fm.get("safe-outputs") {
            Some(v) => Some(parse_safe_outputs(v)?),
            None => None,
        },
        network: match fm.get("network") {
            Some(v) => parse_network(v)?,
            None => NetworkPermissions::Defaults,
        },
        network_declared: fm.contains_key("network"),
        roles: parse_roles(fm)?,
        reaction: parse_reaction_keys(fm)?,
        sandbox: match fm.get("sandbox") {
            Some(v) => parse_sandbox(v)?,
            None => SandboxConfig::default(),
        },
        custom_steps: match fm.get("steps") {
            Some(v) => parse_steps_from_frontmatter(v)?,
            None => WorkflowSteps::default(),
        },
        markdown: src.markdown.clone(),
        safety_prompt: fm
            .get("safety-prompt")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
        strict: fm.get("strict").and_then(|v| v.as_bool()).unwrap_or(false),
        timeout_minutes,
        unknown_keys: Vec::new(),
    };

    spec.unknown_keys = collect_unknown_keys(fm);
    for key in &spec.unknown_keys {
        warn!(key = %key, "unrecognized front matter key");
    }
    Ok(spec)
}

const KNOWN_KEYS: &[&str] = &[
    "name",
    "description",
    "on",
    "permissions",
    "engine",
    "tools",
    "mcp-servers",
    "network",
    "concurrency",
    "timeout-minutes",
    "timeout_minutes",
    "strict",
    "safe-outputs",
    "imports",
    "steps",
    "command",
    "roles",
    "sandbox",
    "reaction",
    "ai-reaction",
    "campaign",
    "fingerprint",
    "safety-prompt",
];

fn collect_unknown_keys(fm: &Mapping) -> Vec<String> {
    fm.keys()
        .filter_map(|k| k.as_str())
        .filter(|k| !KNOWN_KEYS.contains(k))
        .map(String::from)
        .collect()
}

fn parse_mcp_servers(fm: &Mapping) -> Result<BTreeMap<String, McpServerConfig>> {
    let mut servers = BTreeMap::new();
    let Some(value) = fm.get("mcp-servers") else {
        return Ok(servers);
    };
    let Some(map) = value.as_mapping() else {
        bail!("mcp-servers must be a mapping, got {:?}", value);
    };
    for (k, v) in map {
        let Some(name) = k.as_str() else {
            bail!("mcp-servers keys must be strings, got {:?}", k);
        };
        servers.insert(name.to_string(), parse_mcp_server(name, v)?);
    }
    Ok(servers)
}

fn parse_roles(fm: &Mapping) -> Result<Vec<String>> {
    match fm.get("roles") {
        None => Ok(DEFAULT_ROLES.iter().map(|r| r.to_string()).collect()),
        Some(Value::String(s)) if s == "all" => Ok(vec!["all".to_string()]),
        Some(Value::Sequence(seq)) => {
            let mut roles = Vec::with_capacity(seq.len());
            for entry in seq {
                let Some(role) = entry.as_str() else {
                    bail!("roles entries must be strings, got {:?}", entry);
                };
                roles.push(role.to_string());
            }
            Ok(roles)
        }
        Some(other) => bail!("roles must be 'all' or a list, got {:?}", other),
    }
}

fn parse_reaction_keys(fm: &Mapping) -> Result<AiReaction> {
    match (fm.get("reaction"), fm.get("ai-reaction")) {
        (Some(_), Some(_)) => bail!("declare either 'reaction' or 'ai-reaction', not both"),
        (Some(v), None) | (None, Some(v)) => parse_reaction(v),
        (None, None) => Ok(AiReaction::default()),
    }
}

fn parse_timeout(fm: &Mapping) -> Result<Option<u64>> {
    let dashed = fm.get("timeout-minutes");
    let underscored = fm.get("timeout_minutes");
    if dashed.is_some() && underscored.is_some() {
        bail!("declare either 'timeout-minutes' or 'timeout_minutes', not both");
    }
    if underscored.is_some() {
        warn!("'timeout_minutes' is deprecated; use 'timeout-minutes'");
    }
    match dashed.or(underscored) {
        None => Ok(None),
        Some(v) => match as_u64(v) {
            Some(minutes) => Ok(Some(minutes)),
            None => bail!("timeout-minutes must be a non-negative integer, got {:?}", v),
        },
    }
}

fn default_triggers(has_command: bool) -> Value {
    let mut on = Mapping::new();
    if has_command {
        let types = |names: &[&str]| {
            let mut m = Mapping::new();
            m.insert(
                Value::String("types".into()),
                Value::Sequence(names.iter().map(|n| Value::String(n.to_string())).collect()),
            );
            Value::Mapping(m)
        };
        on.insert(Value::String("issue_comment".into()), types(&["created"]));
        on.insert(
            Value::String("issues".into()),
            types(&["opened", "edited", "reopened"]),
        );
        on.insert(
            Value::String("pull_request".into()),
            types(&["opened", "edited", "reopened"]),
        );
    } else {
        on.insert(Value::String("workflow_dispatch".into()), Value::Null);
    }
    Value::Mapping(on)
}

fn get_str(fm: &Mapping, key: &str) -> Option<String> {
    fm.get(key).and_then(|v| v.as_str()).map(Into::into)
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod workflow_tests;
