use super::*;
use fl_config::parse_workflow;
use fl_frontmatter::split_frontmatter;

fn build(frontmatter: &str, body: &str) -> Job {
    let src = split_frontmatter(&format!("---\n{frontmatter}\n---\n{body}")).unwrap();
    let spec = parse_workflow(&src, "wf").unwrap();
    build_agent(&BuildContext::new(&spec)).unwrap()
}

#[test]
fn test_agent_depends_on_activation() {
    let job = build("on: push\npermissions:\n  contents: read", "Do things.");
    assert_eq!(job.needs, vec!["activation"]);
    assert_eq!(job.timeout_minutes, Some(20));
}

#[test]
fn test_sandbox_escape_skips_forced_contents_read() {
    let job = build(
        "on: push\nsandbox:\n  escape: true\npermissions:\n  issues: read",
        "body",
    );
    match job.permissions.unwrap() {
        JobPermissions::Scoped(map) => assert!(!map.contains_key("contents")),
        other => panic!("unexpected permissions: {other:?}"),
    }
}

#[test]
fn test_sandbox_toolchain_env_and_mounts() {
    let job = build(
        "on: push\nsandbox:\n  toolchains:\n    node:\n      env:\n        NODE_ENV: production\n      mounts:\n        - /opt/node:/opt/node:ro",
        "body",
    );
    assert_eq!(job.env.get("NODE_ENV").map(String::as_str), Some("production"));
    assert_eq!(
        job.env.get("GH_AW_SANDBOX_MOUNTS").map(String::as_str),
        Some("\"/opt/node:/opt/node:ro\"")
    );
}

#[test]
fn test_contents_read_forced_on_agent() {
    let job = build("on: push\npermissions:\n  issues: read", "body");
    match job.permissions.unwrap() {
        JobPermissions::Scoped(map) => {
            assert_eq!(map.get("contents").map(String::as_str), Some("read"));
        }
        other => panic!("unexpected permissions: {other:?}"),
    }
}

#[test]
fn test_checkout_present_with_contents_read() {
    let job = build("on: push\npermissions:\n  contents: read", "body");
    assert!(job.steps.iter().any(|s| s.contains("- name: Checkout repository")));
}

#[test]
fn test_checkout_suppressed_without_contents_read() {
    let job = build("on:\n  pull_request:\n    types: [opened]\npermissions:\n  issues: read", "body");
    assert!(!job.steps.iter().any(|s| s.contains("- name: Checkout repository")));
}

#[test]
fn test_pr_trigger_checks_out_head_sha() {
    let job = build(
        "on:\n  pull_request:\n    types: [opened]\npermissions:\n  contents: read",
        "body",
    );
    let checkout = job
        .steps
        .iter()
        .find(|s| s.contains("Checkout repository"))
        .unwrap();
    assert!(checkout.contains("ref: ${{ github.event.pull_request.head.sha }}"));
}

#[test]
fn test_checkout_uses_pinned_sha() {
    let job = build("on: push\npermissions:\n  contents: read", "body");
    let checkout = job
        .steps
        .iter()
        .find(|s| s.contains("Checkout repository"))
        .unwrap();
    assert!(checkout.contains("actions/checkout@08c6903cd8c0fde910a37f88322edcfb5dd907a8"));
}

#[test]
fn test_timeout_override() {
    let job = build("on: push\ntimeout-minutes: 45", "body");
    assert_eq!(job.timeout_minutes, Some(45));
}

#[test]
fn test_engine_installation_and_execution_present() {
    let job = build("on: push\nengine: copilot", "body");
    assert!(job.steps.iter().any(|s| s.contains("npm install -g @github/copilot")));
    assert!(job.steps.iter().any(|s| s.contains("- name: Run GitHub Copilot CLI")));
}

#[test]
fn test_prompt_step_writes_body() {
    let job = build("on: push", "Summarize the issue.");
    let prompt = job
        .steps
        .iter()
        .find(|s| s.contains("Write agent prompt"))
        .unwrap();
    assert!(prompt.contains("Summarize the issue."));
    assert!(prompt.contains("cat >> $GH_AW_PROMPT << 'EOF'"));
    // Safety prompt is on by default.
    assert!(prompt.contains("Security guidance"));
}

#[test]
fn test_safety_prompt_disabled() {
    let job = build("on: push\nsafety-prompt: false", "body");
    let prompt = job
        .steps
        .iter()
        .find(|s| s.contains("Write agent prompt"))
        .unwrap();
    assert!(!prompt.contains("Security guidance"));
}

#[test]
fn test_expression_extraction() {
    let (sanitized, mappings) = extract_expressions("Repo: ${{ github.repository }} run ${{ github.run_id }}");
    assert_eq!(sanitized, "Repo: __GH_AW_EXPR_0__ run __GH_AW_EXPR_1__");
    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings[0].env_var, "GH_AW_EXPR_0");
    assert_eq!(mappings[0].content, "github.repository");
}

#[test]
fn test_expression_extraction_dedupes() {
    let (sanitized, mappings) =
        extract_expressions("${{ github.actor }} and ${{ github.actor }}");
    assert_eq!(sanitized, "__GH_AW_EXPR_0__ and __GH_AW_EXPR_0__");
    assert_eq!(mappings.len(), 1);
}

#[test]
fn test_expressions_never_inlined_in_prompt() {
    let job = build("on: push", "Actor: ${{ github.actor }}");
    let prompt = job
        .steps
        .iter()
        .find(|s| s.contains("Write agent prompt"))
        .unwrap();
    assert!(!prompt.contains("${{ github.actor }}"));
    assert!(prompt.contains("__GH_AW_EXPR_0__"));
    // The substitution step binds the expression to an env var instead.
    let subst = job
        .steps
        .iter()
        .find(|s| s.contains("Substitute prompt placeholders"))
        .unwrap();
    assert!(subst.contains("GH_AW_EXPR_0: ${{ github.actor }}"));
}

#[test]
fn test_no_substitution_step_without_expressions() {
    let job = build("on: push", "No context access here.");
    assert!(!job.steps.iter().any(|s| s.contains("Substitute prompt placeholders")));
}

#[test]
fn test_http_server_rejected_for_non_http_engine() {
    let src = fl_frontmatter::split_frontmatter(
        "---\non: push\nengine: codex\nmcp-servers:\n  deepwiki:\n    url: https://mcp.deepwiki.com/mcp\n---\nbody",
    )
    .unwrap();
    let spec = parse_workflow(&src, "wf").unwrap();
    let err = build_agent(&BuildContext::new(&spec)).unwrap_err();
    assert!(err.to_string().contains("deepwiki"));
    assert!(err.to_string().contains("codex"));
}

#[test]
fn test_mcp_setup_for_configured_servers() {
    let job = build(
        "on: push\ntools:\n  repomix:\n    command: npx\n    args: [\"-y\", \"repomix\", \"--mcp\"]",
        "body",
    );
    assert!(job.steps.iter().any(|s| s.contains("- name: Setup MCPs")));
}

#[test]
fn test_gateway_rewrites_and_adds_lifecycle_steps() {
    let job = build(
        "on: push\ntools:\n  mcp-gateway:\n    port: 9000\n  repomix:\n    command: npx",
        "body",
    );
    assert!(job.steps.iter().any(|s| s.contains("Start MCP Gateway")));
    assert!(job.steps.iter().any(|s| s.contains("Verify MCP Gateway Health")));
    let setup = job.steps.iter().find(|s| s.contains("Setup MCPs")).unwrap();
    assert!(setup.contains("http://localhost:9000/mcp/repomix"));
}

#[test]
fn test_container_predownload_precedes_setup() {
    let job = build(
        "on: push\ntools:\n  github:\n    container: ghcr.io/github/github-mcp-server:v0.30.0",
        "body",
    );
    let download = job
        .steps
        .iter()
        .position(|s| s.contains("Downloading container images"))
        .unwrap();
    let setup = job.steps.iter().position(|s| s.contains("Setup MCPs")).unwrap();
    assert!(download < setup);
}

#[test]
fn test_patch_step_only_with_git_sinks() {
    let job = build("on: push\nsafe-outputs:\n  create-pull-request:", "body");
    assert!(job.steps.iter().any(|s| s.contains("Capture repository patch")));

    let job = build("on: push\nsafe-outputs:\n  add-comment:", "body");
    assert!(!job.steps.iter().any(|s| s.contains("Capture repository patch")));
}

#[test]
fn test_outputs_forward_collect_step() {
    let job = build("on: push", "body");
    assert!(job.outputs.iter().any(|(name, expr)| {
        name == "output" && expr == "${{ steps.collect_output.outputs.output }}"
    }));
    assert!(job.outputs.iter().any(|(name, _)| name == "output_types"));
    assert!(job.outputs.iter().any(|(name, _)| name == "has_patch"));
}

#[test]
fn test_custom_steps_positions() {
    let job = build(
        "on: push\nsteps:\n  pre:\n    - name: Early\n      run: echo early\n  post:\n    - name: Late\n      run: echo late",
        "body",
    );
    let early = job.steps.iter().position(|s| s.contains("Early")).unwrap();
    let late = job.steps.iter().position(|s| s.contains("Late")).unwrap();
    let exec = job.steps.iter().position(|s| s.contains("Run Claude Code")).unwrap();
    assert!(early < exec);
    assert!(late > exec);
    assert_eq!(late, job.steps.len() - 1);
}
