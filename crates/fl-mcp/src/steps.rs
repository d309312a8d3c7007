//! Agent-job steps that materialize MCP configuration on the runner.

use anyhow::Result;
use std::collections::BTreeMap;

use fl_config::McpServerConfig;
use fl_emit::{YamlBuilder, append_heredoc};
use fl_engine::McpDialect;

use crate::render::render_mcp_config;

/// `docker pull` every containerized stdio server's image.
///
/// Must precede the Setup MCPs step so server startup never waits on an
/// image download. Returns `None` when no server is containerized.
pub fn container_predownload_step(servers: &BTreeMap<String, McpServerConfig>) -> Option<String> {
    let images: Vec<&str> = servers
        .values()
        .filter_map(|s| s.container_image())
        .collect();
    if images.is_empty() {
        return None;
    }
    let mut b = YamlBuilder::new();
    b.line(6, "- name: Downloading container images");
    b.line(8, "run: |");
    b.line(10, "set -e");
    for image in images {
        b.line(10, &format!("docker pull {image}"));
    }
    Some(b.finish().trim_end().to_string())
}

/// Write the engine's MCP configuration files under `/tmp/gh-aw/`.
pub fn setup_mcp_steps(
    dialect: McpDialect,
    servers: &BTreeMap<String, McpServerConfig>,
) -> Result<Vec<String>> {
    if servers.is_empty() {
        return Ok(Vec::new());
    }
    let rendered = render_mcp_config(dialect, servers)?;
    let config_file = match dialect {
        McpDialect::Toml => "/tmp/gh-aw/mcp-config.toml",
        McpDialect::Json | McpDialect::JsonEnv => "/tmp/gh-aw/mcp-config.json",
    };

    let mut b = YamlBuilder::new();
    b.line(6, "- name: Setup MCPs");
    b.line(8, "run: |");
    b.line(10, "mkdir -p /tmp/gh-aw");
    append_heredoc(&mut b, 10, config_file, &rendered.document);
    for (server, content) in &rendered.env_files {
        b.line(10, &format!("mkdir -p /tmp/gh-aw/mcp-env/{server}"));
        append_heredoc(&mut b, 10, &format!("/tmp/gh-aw/mcp-env/{server}/.env"), content);
    }
    Ok(vec![b.finish().trim_end().to_string()])
}
