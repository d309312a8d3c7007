use super::*;
use fl_process::testing::FakeRunner;
use std::fs;

fn compile(source: &str) -> CompiledWorkflow {
    try_compile(source).unwrap()
}

fn try_compile(source: &str) -> Result<CompiledWorkflow> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test-workflow.md");
    fs::write(&path, source).unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;
    options.no_emit = true;
    compile_workflow(&path, &options)
}

#[test]
fn test_minimal_copilot_workflow() {
    // S1: pinned checkout and github-script, no floating tags.
    let compiled = compile(
        "---\non: push\nengine: copilot\npermissions:\n  contents: read\n  issues: read\n  pull-requests: read\n---\nSummarize recent activity.",
    );
    let out = &compiled.content;
    assert!(out.contains("uses: actions/checkout@08c6903cd8c0fde910a37f88322edcfb5dd907a8"));
    assert!(out.contains("uses: actions/github-script@ed597411d8f924073f98dfc5c65a23a2325f34cd"));
    assert!(!out.contains("@v5"));
    assert!(!out.contains("@v8"));
}

#[test]
fn test_every_uses_is_pinned_or_local() {
    let compiled = compile(
        "---\non: push\nsafe-outputs:\n  create-issue:\n  add-comment:\n  create-pull-request:\n  threat-detection: true\n---\nbody",
    );
    for line in compiled.content.lines() {
        let trimmed = line.trim_start();
        let Some(value) = trimmed.strip_prefix("uses: ").or_else(|| trimmed.strip_prefix("- uses: "))
        else {
            continue;
        };
        if value.starts_with("./") {
            continue;
        }
        let (_, version) = value.split_once('@').expect("uses without @");
        assert_eq!(version.len(), 40, "unpinned reference: {value}");
        assert!(
            version.chars().all(|c| c.is_ascii_hexdigit()),
            "non-hex pin: {value}"
        );
    }
}

#[test]
fn test_create_issue_sink_contract() {
    // S2: job shape, env, and forwarded outputs.
    let compiled = compile(
        "---\non: push\nsafe-outputs:\n  create-issue:\n    title-prefix: \"[test] \"\n    labels: [automation, test]\n---\nbody",
    );
    let out = &compiled.content;
    assert!(out.contains("  create_issue:\n"));
    assert!(out.contains("permissions:\n      contents: read\n      issues: write"));
    assert!(out.contains("GH_AW_ISSUE_TITLE_PREFIX: \"[test] \""));
    assert!(out.contains("GH_AW_ISSUE_LABELS: \"automation,test\""));
    assert!(out.contains("issue_number: ${{ steps.create_issue.outputs.issue_number }}"));
}

#[test]
fn test_concurrency_derivation() {
    // S3: PR trigger cancels, command trigger does not.
    let pr = compile("---\non:\n  pull_request:\n    types: [opened]\n---\nbody");
    assert!(pr.content.contains(
        "concurrency:\n  group: \"gh-aw-${{ github.workflow }}-${{ github.ref }}\"\n  cancel-in-progress: true"
    ));

    let command = compile("---\ncommand: helper\n---\nbody");
    assert!(command.content.contains(
        "${{ github.event.issue.number || github.event.pull_request.number }}"
    ));
    assert!(!command.content.contains("cancel-in-progress"));
}

#[test]
fn test_reaction_none_with_command_trigger() {
    // S4: no reaction step, no write permissions on activation, but a
    // conclusion job because add-comment is configured.
    let compiled = compile(
        "---\ncommand: helper\nreaction: none\nsafe-outputs:\n  add-comment:\n---\nbody",
    );
    let out = &compiled.content;
    let activation = out
        .split("\n  agent:\n")
        .next()
        .unwrap();
    assert!(!activation.contains("Add reaction"));
    assert!(!activation.contains("issues: write"));
    assert!(!activation.contains("pull-requests: write"));
    assert!(!activation.contains("discussions: write"));
    assert!(activation.contains("contents: read"));
    assert!(out.contains("  conclusion:\n"));
}

#[test]
fn test_strict_mode_custom_job_write() {
    // S5: error message names the custom job and the write grant.
    let err = try_compile(
        "---\non: push\nstrict: true\nnetwork:\n  allowed: []\nsafe-outputs:\n  jobs:\n    deploy:\n      permissions:\n        contents: write\n---\nbody",
    )
    .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("Custom job"), "{msg}");
    assert!(msg.contains("write"), "{msg}");
}

#[test]
fn test_update_pull_request_defaults() {
    // S6: omitted fields default to true; explicit false sticks.
    let compiled = compile("---\non: push\nsafe-outputs:\n  update-pull-request:\n---\nbody");
    assert!(compiled.content.contains("GH_AW_UPDATE_TITLE: \"true\""));
    assert!(compiled.content.contains("GH_AW_UPDATE_BODY: \"true\""));

    let compiled = compile(
        "---\non: push\nsafe-outputs:\n  update-pull-request:\n    title: false\n---\nbody",
    );
    assert!(compiled.content.contains("GH_AW_UPDATE_TITLE: \"false\""));
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "---\non: push\nsafe-outputs:\n  create-issue:\n  add-comment:\n  noop:\n---\nbody text";
    let first = compile(source);
    let second = compile(source);
    assert_eq!(first.content, second.content);
}

#[test]
fn test_no_emitted_line_exceeds_limit() {
    let compiled = compile(
        "---\non: push\nsafe-outputs:\n  create-issue:\n  create-pull-request:\n---\nbody",
    );
    for line in compiled.content.lines() {
        assert!(line.len() <= fl_emit::EMIT_LINE_LIMIT);
    }
}

#[test]
fn test_safe_output_jobs_transitively_need_agent() {
    let compiled = compile(
        "---\non: push\nsafe-outputs:\n  threat-detection: true\n  create-issue:\n  add-comment:\n---\nbody",
    );
    // The sink jobs name agent directly and detection (which needs agent).
    let out = &compiled.content;
    let create_issue = out.split("  create_issue:\n").nth(1).unwrap();
    let needs_block = create_issue.split("runs-on").next().unwrap();
    assert!(needs_block.contains("agent"));
    assert!(needs_block.contains("detection"));
}

#[test]
fn test_lock_file_written_next_to_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weekly.md");
    fs::write(&path, "---\non: push\n---\nbody").unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;
    let compiled = compile_workflow(&path, &options).unwrap();
    assert_eq!(compiled.lock_path, dir.path().join("weekly.lock.yml"));
    let written = fs::read_to_string(&compiled.lock_path).unwrap();
    assert_eq!(written, compiled.content);
    // No temp file left behind.
    assert!(!dir.path().join("weekly.lock.yml.tmp").exists());
}

#[test]
fn test_check_mode_reports_drift() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weekly.md");
    fs::write(&path, "---\non: push\n---\nbody").unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;

    // First compile writes the lock file.
    compile_workflow(&path, &options).unwrap();

    // Unchanged source: no drift.
    options.check = true;
    assert!(!compile_workflow(&path, &options).unwrap().drifted);

    // Changed source: drift.
    fs::write(&path, "---\non: push\n---\nchanged body").unwrap();
    assert!(compile_workflow(&path, &options).unwrap().drifted);
}

#[test]
fn test_invalid_workflow_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.md");
    fs::write(&path, "---\non: push\n---\n${{ secrets.NAUGHTY }}").unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;
    assert!(compile_workflow(&path, &options).is_err());
    assert!(!dir.path().join("bad.lock.yml").exists());
}

#[test]
fn test_name_falls_back_to_file_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issue-triage.md");
    fs::write(&path, "---\non: push\n---\nbody").unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;
    options.no_emit = true;
    let compiled = compile_workflow(&path, &options).unwrap();
    assert!(compiled.content.contains("name: \"issue-triage\""));
}

#[test]
fn test_imports_resolve_during_compilation() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("shared.md"),
        "---\ntools:\n  web-fetch:\n---\nShared guidance.",
    )
    .unwrap();
    let path = dir.path().join("main.md");
    fs::write(&path, "---\non: push\n---\n@include shared.md\nMain body.").unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;
    options.no_emit = true;
    let compiled = compile_workflow(&path, &options).unwrap();
    assert!(compiled.content.contains("Shared guidance."));
}

#[test]
fn test_compile_directory_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a-bad.md"), "no front matter").unwrap();
    fs::write(dir.path().join("b-good.md"), "---\non: push\n---\nbody").unwrap();
    let runner = FakeRunner::new(vec![]);
    let mut options = CompilerOptions::new(&runner);
    options.offline = true;
    let err = compile_directory(dir.path(), &options).unwrap_err();
    assert!(format!("{err:#}").contains("a-bad.md"));
    // The good file still compiled.
    assert!(dir.path().join("b-good.lock.yml").exists());
}

#[test]
fn test_version_stamp_in_header() {
    let compiled = compile("---\non: push\n---\nbody");
    assert!(compiled.content.contains("# flowlock "));
}
