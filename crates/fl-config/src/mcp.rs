//! MCP server configuration and transport inference.

use anyhow::{Result, bail};
use serde_yaml::Value;
use std::collections::BTreeMap;

use fl_core::CompileError;

use crate::network::{NetworkPermissions, parse_network};

/// MCP transport, inferred or declared per server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransport {
    /// Child process over stdio, optionally wrapped in a container.
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        container: Option<String>,
        mounts: Vec<String>,
        entrypoint_args: Vec<String>,
    },
    /// Remote server over Streamable HTTP.
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl McpTransport {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Http { .. } => "http",
        }
    }
}

/// One MCP server entry from `tools:` or `mcp-servers:`.
#[derive(Debug, Clone, PartialEq)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: McpTransport,
    /// Tool allowlist; `None` means all tools (`"*"`).
    pub allowed_tools: Option<Vec<String>>,
    /// Per-server egress policy (required in strict mode).
    pub network: Option<NetworkPermissions>,
}

impl McpServerConfig {
    pub fn is_stdio(&self) -> bool {
        matches!(self.transport, McpTransport::Stdio { .. })
    }

    /// The container image, when this is a containerized stdio server.
    pub fn container_image(&self) -> Option<&str> {
        match &self.transport {
            McpTransport::Stdio { container, .. } => container.as_deref(),
            McpTransport::Http { .. } => None,
        }
    }
}

/// True when a tool config mapping describes an MCP server.
pub fn has_mcp_config(map: &serde_yaml::Mapping) -> bool {
    ["type", "command", "url", "container", "mcp"]
        .iter()
        .any(|k| map.contains_key(*k))
}

/// Parse one MCP server entry.
///
/// `type` is authoritative; otherwise `command` implies stdio, `url`
/// implies http, and `container` implies a containerized stdio server.
/// A config carrying both `command` and `url` without `type` is
/// ambiguous.
pub fn parse_mcp_server(name: &str, value: &Value) -> Result<McpServerConfig> {
    let Some(map) = value.as_mapping() else {
        bail!("MCP server '{name}' must be a mapping, got {:?}", value);
    };
    // An `mcp:` sub-key nests the server config (tools-map spelling).
    let map = match map.get("mcp") {
        Some(Value::Mapping(inner)) => inner,
        Some(other) => bail!("'{name}.mcp' must be a mapping, got {:?}", other),
        None => map,
    };

    let declared = map.get("type").and_then(|v| v.as_str());
    let has_command = map.contains_key("command");
    let has_url = map.contains_key("url");
    let has_container = map.contains_key("container");

    let kind = match declared {
        Some("stdio") | Some("local") => "stdio",
        Some("http") => "http",
        Some(other) => bail!("MCP server '{name}': unknown type '{other}' (expected: stdio, http)"),
        None => {
            if has_command && has_url {
                return Err(CompileError::MCPTransportAmbiguous(name.to_string()).into());
            } else if has_command || has_container {
                "stdio"
            } else if has_url {
                "http"
            } else {
                bail!("MCP server '{name}' needs a 'command', 'url', or 'container' field");
            }
        }
    };

    let transport = if kind == "stdio" {
        let container = map
            .get("container")
            .and_then(|v| v.as_str())
            .map(String::from);
        let command = match map.get("command").and_then(|v| v.as_str()) {
            Some(c) => c.to_string(),
            None if container.is_some() => "docker".to_string(),
            None => bail!("MCP server '{name}': stdio transport requires 'command'"),
        };
        McpTransport::Stdio {
            command,
            args: string_seq(map.get("args"), name, "args")?,
            env: string_map(map.get("env"), name, "env")?,
            container,
            mounts: string_seq(map.get("mounts"), name, "mounts")?,
            entrypoint_args: string_seq(map.get("entrypoint-args"), name, "entrypoint-args")?,
        }
    } else {
        let Some(url) = map.get("url").and_then(|v| v.as_str()) else {
            bail!("MCP server '{name}': http transport requires 'url'");
        };
        McpTransport::Http {
            url: url.to_string(),
            headers: string_map(map.get("headers"), name, "headers")?,
        }
    };

    let allowed_tools = match map.get("allowed") {
        None => None,
        Some(Value::String(s)) if s == "*" => None,
        Some(Value::Sequence(seq)) => {
            let mut tools = Vec::with_capacity(seq.len());
            for entry in seq {
                let Some(tool) = entry.as_str() else {
                    bail!("MCP server '{name}': allowed entries must be strings");
                };
                tools.push(tool.to_string());
            }
            Some(tools)
        }
        Some(other) => bail!(
            "MCP server '{name}': allowed must be \"*\" or a list, got {:?}",
            other
        ),
    };

    let network = match map.get("network") {
        Some(v) => Some(parse_network(v)?),
        None => None,
    };

    Ok(McpServerConfig {
        name: name.to_string(),
        transport,
        allowed_tools,
        network,
    })
}

fn string_seq(value: Option<&Value>, server: &str, field: &str) -> Result<Vec<String>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Sequence(seq)) => {
            let mut out = Vec::with_capacity(seq.len());
            for entry in seq {
                let Some(s) = entry.as_str() else {
                    bail!("MCP server '{server}': {field} entries must be strings");
                };
                out.push(s.to_string());
            }
            Ok(out)
        }
        Some(other) => bail!("MCP server '{server}': {field} must be a sequence, got {:?}", other),
    }
}

fn string_map(
    value: Option<&Value>,
    server: &str,
    field: &str,
) -> Result<BTreeMap<String, String>> {
    match value {
        None => Ok(BTreeMap::new()),
        Some(Value::Mapping(map)) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let (Some(key), Some(val)) = (k.as_str(), v.as_str()) else {
                    bail!("MCP server '{server}': {field} entries must be string: string");
                };
                out.insert(key.to_string(), val.to_string());
            }
            Ok(out)
        }
        Some(other) => bail!("MCP server '{server}': {field} must be a mapping, got {:?}", other),
    }
}
