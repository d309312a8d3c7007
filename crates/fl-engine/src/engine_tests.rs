use super::*;
use fl_config::engine::parse_engine;

fn config(yaml: &str) -> EngineConfig {
    parse_engine(&serde_yaml::from_str(yaml).unwrap()).unwrap()
}

#[test]
fn test_from_id_roundtrip() {
    for id in EngineId::all() {
        assert_eq!(Engine::from_id(*id).id(), *id);
    }
}

#[test]
fn test_capability_flags() {
    assert!(Engine::Claude.supports_http_transport());
    assert!(Engine::Copilot.supports_http_transport());
    assert!(!Engine::Codex.supports_http_transport());
    assert!(Engine::Claude.supports_tools_whitelist());
    assert!(!Engine::Gemini.supports_tools_whitelist());
    assert!(Engine::Gemini.is_experimental());
    assert!(!Engine::Claude.is_experimental());
}

#[test]
fn test_mcp_dialects() {
    assert_eq!(Engine::Claude.mcp_dialect(), McpDialect::Json);
    assert_eq!(Engine::Codex.mcp_dialect(), McpDialect::Toml);
    assert_eq!(Engine::Copilot.mcp_dialect(), McpDialect::JsonEnv);
}

#[test]
fn test_installation_steps_npm_engine() {
    let steps = Engine::Copilot.installation_steps(&config("copilot"));
    assert_eq!(steps.len(), 2);
    assert!(steps[0].contains("Validate COPILOT_CLI_TOKEN secret"));
    // "A or B" secrets: failure only when both are absent.
    assert!(steps[0].contains("secrets.COPILOT_CLI_TOKEN"));
    assert!(steps[0].contains("secrets.GH_AW_COPILOT_TOKEN"));
    assert!(steps[0].contains(" && "));
    assert!(steps[1].contains("npm install -g @github/copilot@0.0.354"));
}

#[test]
fn test_installation_respects_version_override() {
    let steps = Engine::Claude.installation_steps(&config("id: claude\nversion: \"9.9.9\""));
    assert!(steps[1].contains("@anthropic-ai/claude-code@9.9.9"));
}

#[test]
fn test_custom_engine_has_no_installation() {
    let steps = Engine::Custom.installation_steps(&config("id: custom\nsteps:\n  - run: ./go"));
    assert!(steps.is_empty());
}

#[test]
fn test_execution_steps_claude_prepends_agent_file() {
    let cfg = config("id: claude\nagent: agents/helper.md");
    let steps = Engine::Claude.execution_steps(&cfg, "/tmp/agent.log").unwrap();
    assert_eq!(steps.len(), 1);
    assert!(steps[0].contains("GH_AW_AGENT_FILE: agents/helper.md"));
    assert!(steps[0].contains("awk"));
    assert!(steps[0].contains("tee /tmp/agent.log"));
}

#[test]
fn test_execution_steps_copilot_agent_flag() {
    let cfg = config("id: copilot\nagent: helper");
    let steps = Engine::Copilot.execution_steps(&cfg, "/tmp/agent.log").unwrap();
    assert!(steps[0].contains("--agent helper"));
    assert!(!steps[0].contains("awk"));
}

#[test]
fn test_execution_steps_model_flag() {
    let cfg = config("id: claude\nmodel: claude-sonnet-4-5");
    let steps = Engine::Claude.execution_steps(&cfg, "log").unwrap();
    assert!(steps[0].contains("--model claude-sonnet-4-5"));
}

#[test]
fn test_custom_engine_renders_config_steps() {
    let cfg = config("id: custom\nsteps:\n  - name: Run agent\n    run: ./agent.sh");
    let steps = Engine::Custom.execution_steps(&cfg, "log").unwrap();
    assert_eq!(steps.len(), 1);
    assert!(steps[0].starts_with("      - name: Run agent"));
}

#[test]
fn test_step_blocks_are_final_coordinates() {
    let steps = Engine::Claude.installation_steps(&config("claude"));
    for block in steps {
        assert!(block.starts_with("      - name:"), "bad block start: {block}");
    }
}

#[test]
fn test_parse_claude_log_metrics() {
    let log = concat!(
        r#"{"type":"assistant","message":{"usage":{"input_tokens":1200,"output_tokens":300}}}"#,
        "\n",
        r#"{"type":"result","total_cost_usd":0.42,"num_turns":7}"#,
        "\n",
        "ERROR: transient failure\n",
    );
    let metrics = Engine::Claude.parse_log_metrics(log, true);
    assert_eq!(metrics.token_usage, 1500);
    assert_eq!(metrics.turns, 7);
    assert!((metrics.estimated_cost - 0.42).abs() < 1e-9);
    assert_eq!(metrics.error_count, 1);
    assert_eq!(metrics.errors.len(), 1);
}

#[test]
fn test_parse_copilot_log_metrics() {
    let log = "some output\nTotal usage est: 44,800 tokens\n";
    let metrics = Engine::Copilot.parse_log_metrics(log, false);
    assert_eq!(metrics.token_usage, 44800);
}

#[test]
fn test_parse_codex_log_metrics() {
    let metrics = Engine::Codex.parse_log_metrics("tokens used: 12,345\n", false);
    assert_eq!(metrics.token_usage, 12345);
}

#[test]
fn test_parse_gemini_log_sums_token_kinds() {
    let log = "Prompt tokens: 1,000\nCandidate tokens: 250\n";
    let metrics = Engine::Gemini.parse_log_metrics(log, false);
    assert_eq!(metrics.token_usage, 1250);
}

#[test]
fn test_detect_from_content() {
    let claude_log = r#"{"type":"assistant"} total_cost_usd num_turns"#;
    assert!(Engine::Claude.detect_from_content(claude_log) > 0);
    assert_eq!(Engine::Gemini.detect_from_content(claude_log), 0);

    let copilot_log = "Total usage est: 10 tokens, 2 Premium requests";
    assert!(
        Engine::Copilot.detect_from_content(copilot_log)
            > Engine::Codex.detect_from_content(copilot_log)
    );
}

#[test]
fn test_log_parser_script_names_exist() {
    for engine in [
        Engine::Claude,
        Engine::Copilot,
        Engine::Codex,
        Engine::Gemini,
        Engine::Custom,
    ] {
        assert!(
            crate::assets::get_script(engine.log_parser_script()).is_some(),
            "missing log parser for {}",
            engine.display_name()
        );
    }
}
