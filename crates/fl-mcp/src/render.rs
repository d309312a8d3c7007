//! MCP configuration rendering in the three engine dialects.

use anyhow::{Context, Result};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::collections::BTreeMap;

use fl_config::{McpServerConfig, McpTransport};
use fl_engine::McpDialect;

/// A rendered MCP configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMcpConfig {
    /// The main config document (JSON or TOML text).
    pub document: String,
    /// Per-server `.env` files (Copilot dialect only), keyed by server
    /// name; each file's keys are sorted lexicographically.
    pub env_files: BTreeMap<String, String>,
}

/// Render `servers` in the dialect the engine consumes.
pub fn render_mcp_config(
    dialect: McpDialect,
    servers: &BTreeMap<String, McpServerConfig>,
) -> Result<RenderedMcpConfig> {
    match dialect {
        McpDialect::Json => Ok(RenderedMcpConfig {
            document: render_json(servers, false)?,
            env_files: BTreeMap::new(),
        }),
        McpDialect::Toml => Ok(RenderedMcpConfig {
            document: render_toml(servers)?,
            env_files: BTreeMap::new(),
        }),
        McpDialect::JsonEnv => Ok(RenderedMcpConfig {
            document: render_json(servers, true)?,
            env_files: render_env_files(servers),
        }),
    }
}

fn server_json(server: &McpServerConfig, env_file_ref: bool) -> JsonValue {
    let mut obj = JsonMap::new();
    match &server.transport {
        McpTransport::Stdio {
            command,
            args,
            env,
            container,
            mounts,
            entrypoint_args,
        } => {
            obj.insert("type".into(), json!("stdio"));
            match container {
                Some(image) => {
                    let mut docker_args =
                        vec!["run".to_string(), "--rm".to_string(), "-i".to_string()];
                    for mount in mounts {
                        docker_args.push("-v".to_string());
                        docker_args.push(mount.clone());
                    }
                    for key in env.keys() {
                        docker_args.push("-e".to_string());
                        docker_args.push(key.clone());
                    }
                    docker_args.push(image.clone());
                    docker_args.extend(entrypoint_args.iter().cloned());
                    obj.insert("command".into(), json!("docker"));
                    obj.insert("args".into(), json!(docker_args));
                }
                None => {
                    obj.insert("command".into(), json!(command));
                    if !args.is_empty() {
                        obj.insert("args".into(), json!(args));
                    }
                }
            }
            if !env.is_empty() {
                if env_file_ref {
                    // Copilot reads the values from the per-server .env file.
                    let keys: BTreeMap<&String, String> = env
                        .keys()
                        .map(|k| (k, format!("${{{k}}}")))
                        .collect();
                    obj.insert("env".into(), json!(keys));
                } else {
                    obj.insert("env".into(), json!(env));
                }
            }
        }
        McpTransport::Http { url, headers } => {
            obj.insert("type".into(), json!("http"));
            obj.insert("url".into(), json!(url));
            if !headers.is_empty() {
                obj.insert("headers".into(), json!(headers));
            }
        }
    }
    if let Some(tools) = &server.allowed_tools {
        obj.insert("tools".into(), json!(tools));
    } else {
        obj.insert("tools".into(), json!(["*"]));
    }
    JsonValue::Object(obj)
}

fn render_json(servers: &BTreeMap<String, McpServerConfig>, env_file_ref: bool) -> Result<String> {
    let mut map = JsonMap::new();
    for (name, server) in servers {
        map.insert(name.clone(), server_json(server, env_file_ref));
    }
    let doc = json!({ "mcpServers": JsonValue::Object(map) });
    serde_json::to_string_pretty(&doc).context("cannot render MCP JSON config")
}

fn render_toml(servers: &BTreeMap<String, McpServerConfig>) -> Result<String> {
    let mut root = toml::Table::new();
    let mut tables = toml::Table::new();
    for (name, server) in servers {
        let mut table = toml::Table::new();
        match &server.transport {
            McpTransport::Stdio {
                command,
                args,
                env,
                container,
                mounts,
                entrypoint_args,
            } => {
                match container {
                    Some(image) => {
                        let mut docker_args = vec!["run".to_string(), "--rm".to_string(), "-i".to_string()];
                        for mount in mounts {
                            docker_args.push("-v".to_string());
                            docker_args.push(mount.clone());
                        }
                        for key in env.keys() {
                            docker_args.push("-e".to_string());
                            docker_args.push(key.clone());
                        }
                        docker_args.push(image.clone());
                        docker_args.extend(entrypoint_args.iter().cloned());
                        table.insert("command".into(), toml::Value::String("docker".into()));
                        table.insert(
                            "args".into(),
                            toml::Value::Array(
                                docker_args.into_iter().map(toml::Value::String).collect(),
                            ),
                        );
                    }
                    None => {
                        table.insert("command".into(), toml::Value::String(command.clone()));
                        if !args.is_empty() {
                            table.insert(
                                "args".into(),
                                toml::Value::Array(
                                    args.iter().cloned().map(toml::Value::String).collect(),
                                ),
                            );
                        }
                    }
                }
                if !env.is_empty() {
                    let mut env_table = toml::Table::new();
                    for (k, v) in env {
                        env_table.insert(k.clone(), toml::Value::String(v.clone()));
                    }
                    table.insert("env".into(), toml::Value::Table(env_table));
                }
            }
            McpTransport::Http { url, headers } => {
                table.insert("url".into(), toml::Value::String(url.clone()));
                if !headers.is_empty() {
                    let mut headers_table = toml::Table::new();
                    for (k, v) in headers {
                        headers_table.insert(k.clone(), toml::Value::String(v.clone()));
                    }
                    table.insert("headers".into(), toml::Value::Table(headers_table));
                }
            }
        }
        tables.insert(name.clone(), toml::Value::Table(table));
    }
    root.insert("mcp_servers".into(), toml::Value::Table(tables));
    toml::to_string(&root).context("cannot render MCP TOML config")
}

fn render_env_files(servers: &BTreeMap<String, McpServerConfig>) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for (name, server) in servers {
        let McpTransport::Stdio { env, .. } = &server.transport else {
            continue;
        };
        if env.is_empty() {
            continue;
        }
        // BTreeMap iteration gives the sorted-keys property.
        let content = env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n");
        files.insert(name.clone(), content + "\n");
    }
    files
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
