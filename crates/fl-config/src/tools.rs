//! The `tools:` front-matter map: built-in tools plus custom MCP servers.

use anyhow::{Result, bail};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use crate::mcp::{McpServerConfig, has_mcp_config, parse_mcp_server};

/// Shell access for the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashTool {
    /// Allowed command prefixes; `None` means unrestricted.
    pub allowed: Option<Vec<String>>,
}

/// Hosted GitHub MCP tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GithubTool {
    pub allowed: Option<Vec<String>>,
    pub version: Option<String>,
    pub read_only: bool,
}

/// Browser automation tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaywrightTool {
    pub version: Option<String>,
    pub allowed_domains: Vec<String>,
}

/// Gateway sidecar multiplexing stdio MCP servers over one HTTP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpGatewayTool {
    pub port: u16,
    /// Secret name carrying the gateway bearer token, when auth is on.
    pub api_key: Option<String>,
}

impl Default for McpGatewayTool {
    fn default() -> Self {
        Self {
            port: 8080,
            api_key: None,
        }
    }
}

/// Parsed view of the `tools:` map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolsConfig {
    /// The raw mapping as written (kept for diagnostics).
    pub raw: Mapping,
    pub bash: Option<BashTool>,
    pub edit: bool,
    pub web_fetch: bool,
    pub web_search: bool,
    pub github: Option<GithubTool>,
    pub playwright: Option<PlaywrightTool>,
    pub mcp_gateway: Option<McpGatewayTool>,
    /// User-declared MCP servers keyed by name.
    pub custom_servers: BTreeMap<String, McpServerConfig>,
}

impl ToolsConfig {
    /// Append commands to the bash allow-list, enabling bash if needed.
    ///
    /// No-op for an unrestricted allow-list.
    pub fn add_bash_commands(&mut self, commands: &[&str]) {
        match &mut self.bash {
            None => {
                self.bash = Some(BashTool {
                    allowed: Some(commands.iter().map(|c| c.to_string()).collect()),
                });
            }
            Some(BashTool { allowed: None }) => {}
            Some(BashTool {
                allowed: Some(list),
            }) => {
                for cmd in commands {
                    if !list.iter().any(|c| c == cmd) {
                        list.push(cmd.to_string());
                    }
                }
            }
        }
    }
}

/// Parse the `tools:` mapping.
pub fn parse_tools(value: &Value) -> Result<ToolsConfig> {
    let Some(map) = value.as_mapping() else {
        bail!("tools must be a mapping, got {:?}", value);
    };
    let mut config = ToolsConfig {
        raw: map.clone(),
        ..Default::default()
    };

    for (k, v) in map {
        let Some(key) = k.as_str() else {
            bail!("tool names must be strings, got {:?}", k);
        };
        match key {
            "bash" => config.bash = Some(parse_bash(v)?),
            "edit" => config.edit = true,
            "web-fetch" => config.web_fetch = true,
            "web-search" => config.web_search = true,
            "github" => config.github = Some(parse_github(v)?),
            "playwright" => config.playwright = Some(parse_playwright(v)?),
            "mcp-gateway" => config.mcp_gateway = Some(parse_gateway(v)?),
            name => {
                let Some(tool_map) = v.as_mapping() else {
                    bail!("unknown tool '{name}' (custom tools must be MCP server mappings)");
                };
                if !has_mcp_config(tool_map) {
                    bail!(
                        "unknown tool '{name}': not a built-in tool and no MCP transport fields \
                         (command/url/container/type) present"
                    );
                }
                config
                    .custom_servers
                    .insert(name.to_string(), parse_mcp_server(name, v)?);
            }
        }
    }
    Ok(config)
}

fn parse_bash(value: &Value) -> Result<BashTool> {
    match value {
        Value::Null => Ok(BashTool { allowed: None }),
        Value::String(s) if s == "*" => Ok(BashTool { allowed: None }),
        Value::Sequence(seq) => {
            let mut allowed = Vec::with_capacity(seq.len());
            for entry in seq {
                let Some(cmd) = entry.as_str() else {
                    bail!("bash allow-list entries must be strings, got {:?}", entry);
                };
                allowed.push(cmd.to_string());
            }
            Ok(BashTool {
                allowed: Some(allowed),
            })
        }
        other => bail!("bash must be null, \"*\", or a command list, got {:?}", other),
    }
}

fn parse_github(value: &Value) -> Result<GithubTool> {
    match value {
        Value::Null => Ok(GithubTool::default()),
        Value::Mapping(map) => Ok(GithubTool {
            allowed: match map.get("allowed") {
                Some(Value::Sequence(seq)) => Some(
                    seq.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect(),
                ),
                _ => None,
            },
            version: map.get("version").and_then(|v| v.as_str()).map(Into::into),
            read_only: map
                .get("read-only")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }),
        other => bail!("github tool must be null or a mapping, got {:?}", other),
    }
}

fn parse_playwright(value: &Value) -> Result<PlaywrightTool> {
    match value {
        Value::Null => Ok(PlaywrightTool::default()),
        Value::Mapping(map) => Ok(PlaywrightTool {
            version: map.get("version").and_then(|v| v.as_str()).map(Into::into),
            allowed_domains: match map.get("allowed-domains") {
                Some(Value::Sequence(seq)) => seq
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
                _ => Vec::new(),
            },
        }),
        other => bail!("playwright tool must be null or a mapping, got {:?}", other),
    }
}

fn parse_gateway(value: &Value) -> Result<McpGatewayTool> {
    match value {
        Value::Null => Ok(McpGatewayTool::default()),
        Value::Mapping(map) => {
            let port = match map.get("port") {
                Some(v) => crate::numeric::as_u64(v)
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| anyhow::anyhow!("mcp-gateway.port must be a valid port"))?,
                None => 8080,
            };
            Ok(McpGatewayTool {
                port,
                api_key: map.get("api-key").and_then(|v| v.as_str()).map(Into::into),
            })
        }
        other => bail!("mcp-gateway must be null or a mapping, got {:?}", other),
    }
}
