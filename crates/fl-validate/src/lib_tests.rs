use super::*;
use fl_frontmatter::split_frontmatter;
use fl_process::testing::FakeRunner;

fn spec(frontmatter: &str, body: &str) -> WorkflowSpec {
    let src = split_frontmatter(&format!("---\n{frontmatter}\n---\n{body}")).unwrap();
    fl_config::parse_workflow(&src, "wf").unwrap()
}

fn options() -> ValidateOptions {
    ValidateOptions {
        strict: false,
        skip_probes: true,
    }
}

#[test]
fn test_clean_workflow_passes() {
    let runner = FakeRunner::new(vec![]);
    let spec = spec("on: push\npermissions:\n  contents: read", "Do things.");
    assert!(validate_workflow(&spec, &runner, options()).is_ok());
}

#[test]
fn test_errors_accumulate_into_bullets() {
    let runner = FakeRunner::new(vec![]);
    let spec = spec(
        "on: push",
        "${{ secrets.TOKEN }}\n{{#if x}}\n@include a.md\n{{/if}}",
    );
    let err = validate_workflow(&spec, &runner, options()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("workflow validation failed"));
    assert!(msg.contains("  - "));
    assert!(msg.contains("secrets.TOKEN"));
    assert!(msg.contains("template regions"));
}

#[test]
fn test_strict_flag_from_cli_or_frontmatter() {
    let runner = FakeRunner::new(vec![]);

    // Front-matter strict: true triggers the strict checks.
    let spec_fm = spec("on: push\nstrict: true\nnetwork: \"*\"", "body");
    assert!(validate_workflow(&spec_fm, &runner, options()).is_err());

    // CLI strict triggers them even when front matter does not opt in.
    let spec_plain = spec("on: push\nnetwork: \"*\"", "body");
    assert!(
        validate_workflow(
            &spec_plain,
            &runner,
            ValidateOptions {
                strict: true,
                skip_probes: true,
            }
        )
        .is_err()
    );
    assert!(validate_workflow(&spec_plain, &runner, options()).is_ok());
}

#[test]
fn test_strict_custom_job_write_message() {
    let runner = FakeRunner::new(vec![]);
    let spec = spec(
        "on: push\nstrict: true\nnetwork:\n  allowed: []\nsafe-outputs:\n  jobs:\n    deploy:\n      permissions:\n        packages: write",
        "body",
    );
    let err = validate_workflow(&spec, &runner, options()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Custom job"));
    assert!(msg.contains("write"));
}

#[test]
fn test_payload_precheck_boundary() {
    let runner = FakeRunner::new(vec![]);
    let ok_line = "x".repeat(20_000);
    let spec_ok = spec(
        &format!("on: push\nsteps:\n  - name: Big\n    run: {ok_line}"),
        "body",
    );
    assert!(validate_workflow(&spec_ok, &runner, options()).is_ok());

    let long_line = "x".repeat(20_001);
    let spec_long = spec(
        &format!("on: push\nsteps:\n  - name: Big\n    run: {long_line}"),
        "body",
    );
    let err = validate_workflow(&spec_long, &runner, options()).unwrap_err();
    assert!(err.to_string().contains("20001"));
}

#[test]
fn test_probes_run_when_enabled() {
    // Missing npm package becomes a hard error through the full chain.
    let runner = FakeRunner::new(vec![FakeRunner::failed("404")]);
    let spec = spec(
        "on: push\nsteps:\n  - name: Install\n    run: npm install ghost-package",
        "body",
    );
    let err = validate_workflow(
        &spec,
        &runner,
        ValidateOptions {
            strict: false,
            skip_probes: false,
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("ghost-package"));
}
