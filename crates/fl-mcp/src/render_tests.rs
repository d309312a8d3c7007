use super::*;
use fl_config::mcp::parse_mcp_server;

fn server(name: &str, yaml: &str) -> (String, McpServerConfig) {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    (name.to_string(), parse_mcp_server(name, &value).unwrap())
}

fn servers(entries: Vec<(String, McpServerConfig)>) -> BTreeMap<String, McpServerConfig> {
    entries.into_iter().collect()
}

#[test]
fn test_json_dialect_stdio() {
    let map = servers(vec![server(
        "repomix",
        "command: npx\nargs: [\"-y\", \"repomix\", \"--mcp\"]",
    )]);
    let rendered = render_mcp_config(McpDialect::Json, &map).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&rendered.document).unwrap();
    assert_eq!(doc["mcpServers"]["repomix"]["command"], "npx");
    assert_eq!(doc["mcpServers"]["repomix"]["type"], "stdio");
    assert_eq!(doc["mcpServers"]["repomix"]["tools"][0], "*");
    assert!(rendered.env_files.is_empty());
}

#[test]
fn test_json_dialect_http_headers() {
    let map = servers(vec![server(
        "deepwiki",
        "url: https://mcp.deepwiki.com/mcp\nheaders:\n  Authorization: Bearer abc",
    )]);
    let rendered = render_mcp_config(McpDialect::Json, &map).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&rendered.document).unwrap();
    assert_eq!(doc["mcpServers"]["deepwiki"]["type"], "http");
    assert_eq!(
        doc["mcpServers"]["deepwiki"]["headers"]["Authorization"],
        "Bearer abc"
    );
}

#[test]
fn test_json_container_becomes_docker_run() {
    let map = servers(vec![server(
        "github",
        "container: ghcr.io/github/github-mcp-server:v0.30.0\nenv:\n  GITHUB_TOKEN: x",
    )]);
    let rendered = render_mcp_config(McpDialect::Json, &map).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&rendered.document).unwrap();
    let args = doc["mcpServers"]["github"]["args"].as_array().unwrap();
    let flat: Vec<&str> = args.iter().filter_map(|v| v.as_str()).collect();
    assert_eq!(doc["mcpServers"]["github"]["command"], "docker");
    assert!(flat.starts_with(&["run", "--rm", "-i"]));
    assert!(flat.contains(&"ghcr.io/github/github-mcp-server:v0.30.0"));
    assert!(flat.contains(&"-e"));
    assert!(flat.contains(&"GITHUB_TOKEN"));
}

#[test]
fn test_toml_dialect_tables() {
    let map = servers(vec![server(
        "repomix",
        "command: npx\nargs: [\"-y\", \"repomix\"]\nenv:\n  LOG: debug",
    )]);
    let rendered = render_mcp_config(McpDialect::Toml, &map).unwrap();
    assert!(rendered.document.contains("[mcp_servers.repomix]"));
    assert!(rendered.document.contains("command = \"npx\""));
    assert!(rendered.document.contains("[mcp_servers.repomix.env]"));
    assert!(rendered.document.contains("LOG = \"debug\""));
}

#[test]
fn test_copilot_env_files_sorted() {
    let map = servers(vec![server(
        "custom",
        "command: ./server\nenv:\n  ZEBRA: z\n  ALPHA: a\n  MIDDLE: m",
    )]);
    let rendered = render_mcp_config(McpDialect::JsonEnv, &map).unwrap();
    let env_file = &rendered.env_files["custom"];
    let keys: Vec<&str> = env_file
        .lines()
        .map(|l| l.split('=').next().unwrap())
        .collect();
    assert_eq!(keys, vec!["ALPHA", "MIDDLE", "ZEBRA"]);

    // The JSON document references the variables, not the values.
    let doc: serde_json::Value = serde_json::from_str(&rendered.document).unwrap();
    assert_eq!(doc["mcpServers"]["custom"]["env"]["ALPHA"], "${ALPHA}");
}

#[test]
fn test_allowed_tools_rendered() {
    let map = servers(vec![server(
        "github",
        "container: ghcr.io/github/github-mcp-server:v0.30.0\nallowed: [get_issue, list_issues]",
    )]);
    let rendered = render_mcp_config(McpDialect::Json, &map).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&rendered.document).unwrap();
    let tools = doc["mcpServers"]["github"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0], "get_issue");
}

#[test]
fn test_deterministic_rendering() {
    let map = servers(vec![
        server("b-server", "command: ./b"),
        server("a-server", "command: ./a"),
    ]);
    let first = render_mcp_config(McpDialect::Json, &map).unwrap();
    let second = render_mcp_config(McpDialect::Json, &map).unwrap();
    assert_eq!(first, second);
    // BTreeMap ordering puts a-server before b-server.
    let a_pos = first.document.find("a-server").unwrap();
    let b_pos = first.document.find("b-server").unwrap();
    assert!(a_pos < b_pos);
}
