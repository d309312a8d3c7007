//! MCP gateway sidecar: stdio servers multiplexed behind one HTTP port.

use std::collections::BTreeMap;

use fl_config::tools::McpGatewayTool;
use fl_config::{McpServerConfig, McpTransport};
use fl_emit::YamlBuilder;

/// Rewrite stdio servers to their gateway HTTP endpoints.
///
/// HTTP servers pass through untouched. Each rewritten entry keeps the
/// server's own tool allowlist so engines that enforce it still do.
pub fn rewrite_servers_for_gateway(
    servers: &BTreeMap<String, McpServerConfig>,
    gateway: &McpGatewayTool,
) -> BTreeMap<String, McpServerConfig> {
    let mut rewritten = BTreeMap::new();
    for (name, server) in servers {
        match &server.transport {
            McpTransport::Http { .. } => {
                rewritten.insert(name.clone(), server.clone());
            }
            McpTransport::Stdio { .. } => {
                let mut headers = BTreeMap::new();
                if gateway.api_key.is_some() {
                    headers.insert(
                        "Authorization".to_string(),
                        "Bearer ${MCP_GATEWAY_API_KEY}".to_string(),
                    );
                }
                rewritten.insert(
                    name.clone(),
                    McpServerConfig {
                        name: name.clone(),
                        transport: McpTransport::Http {
                            url: format!("http://localhost:{}/mcp/{}", gateway.port, name),
                            headers,
                        },
                        allowed_tools: server.allowed_tools.clone(),
                        network: server.network.clone(),
                    },
                );
            }
        }
    }
    rewritten
}

/// The two gateway lifecycle steps: start the sidecar (materializing
/// its server map first), then poll its health endpoint with bounded
/// retries.
pub fn gateway_steps(
    gateway: &McpGatewayTool,
    stdio_servers: &BTreeMap<String, McpServerConfig>,
) -> anyhow::Result<Vec<String>> {
    let mut steps = Vec::with_capacity(2);
    let gateway_config =
        crate::render::render_mcp_config(fl_engine::McpDialect::Json, stdio_servers)?;

    let mut b = YamlBuilder::new();
    b.line(6, "- name: Start MCP Gateway");
    if let Some(api_key) = &gateway.api_key {
        b.line(8, "env:");
        b.line(
            10,
            &format!("MCP_GATEWAY_API_KEY: ${{{{ secrets.{api_key} }}}}"),
        );
    }
    b.line(8, "run: |");
    b.line(10, "mkdir -p /tmp/gh-aw");
    fl_emit::append_heredoc(&mut b, 10, "/tmp/gh-aw/mcp-gateway.json", &gateway_config.document);
    b.line(10, "docker run -d --name mcp-gateway \\");
    b.line(10, &format!("  -p {}:{} \\", gateway.port, gateway.port));
    b.line(10, "  -v /tmp/gh-aw/mcp-gateway.json:/etc/mcp-gateway.json:ro \\");
    b.line(10, "  -v /var/run/docker.sock:/var/run/docker.sock \\");
    if gateway.api_key.is_some() {
        b.line(10, "  -e MCP_GATEWAY_API_KEY \\");
    }
    b.line(
        10,
        &format!(
            "  ghcr.io/github/mcp-gateway:latest --config /etc/mcp-gateway.json --port {}",
            gateway.port
        ),
    );
    steps.push(b.finish().trim_end().to_string());

    let mut b = YamlBuilder::new();
    b.line(6, "- name: Verify MCP Gateway Health");
    b.line(8, "run: |");
    b.line(10, "for i in $(seq 1 30); do");
    b.line(
        10,
        &format!(
            "  if curl -fsS http://localhost:{}/health > /dev/null; then",
            gateway.port
        ),
    );
    b.line(10, "    echo \"gateway healthy after ${i}s\"");
    b.line(10, "    exit 0");
    b.line(10, "  fi");
    b.line(10, "  sleep 1");
    b.line(10, "done");
    b.line(10, "echo \"error: MCP gateway did not become healthy\" >&2");
    b.line(10, "exit 1");
    steps.push(b.finish().trim_end().to_string());

    Ok(steps)
}
