use super::*;
use crate::source::split_frontmatter;
use std::fs;

fn write(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn source(frontmatter: &str, body: &str) -> WorkflowSource {
    split_frontmatter(&format!("---\n{frontmatter}\n---\n{body}")).unwrap()
}

#[test]
fn test_include_splices_body() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared.md", "Shared instructions.");
    let src = source("name: demo", "Before\n@include shared.md\nAfter");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    assert_eq!(resolved.markdown, "Before\nShared instructions.\nAfter");
}

#[test]
fn test_include_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let src = source("name: demo", "@include missing.md");
    let err = resolve_imports(src, dir.path()).unwrap_err();
    assert!(err.to_string().contains("missing.md"));
}

#[test]
fn test_optional_include_missing_file_noops() {
    let dir = tempfile::tempdir().unwrap();
    let src = source("name: demo", "@include? missing.md");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    assert!(resolved.markdown.contains("optional include not found"));
}

#[test]
fn test_import_cycle_detected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "@include b.md");
    write(dir.path(), "b.md", "@include a.md");
    let src = source("name: demo", "@include a.md");
    let err = resolve_imports(src, dir.path()).unwrap_err();
    let compile_err = err.downcast_ref::<fl_core::CompileError>().unwrap();
    assert!(matches!(compile_err, fl_core::CompileError::ImportCycle(_)));
    assert!(compile_err.to_string().contains("a.md"));
}

#[test]
fn test_diamond_import_is_not_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "leaf.md", "leaf text");
    write(dir.path(), "a.md", "@include leaf.md");
    write(dir.path(), "b.md", "@include leaf.md");
    let src = source("name: demo", "@include a.md\n@include b.md");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    // The second splice of the shared leaf collapses to nothing.
    assert_eq!(resolved.markdown.matches("leaf text").count(), 1);
}

#[test]
fn test_include_inside_template_region_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared.md", "text");
    let src = source(
        "name: demo",
        "{{#if github.event.issue}}\n@include shared.md\n{{/if}}",
    );
    let err = resolve_imports(src, dir.path()).unwrap_err();
    let compile_err = err.downcast_ref::<fl_core::CompileError>().unwrap();
    assert!(matches!(
        compile_err,
        fl_core::CompileError::IncludeInsideTemplate(2)
    ));
}

#[test]
fn test_include_after_template_region_ok() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared.md", "text");
    let src = source(
        "name: demo",
        "{{#if github.event.issue}}\nconditional\n{{/if}}\n@include shared.md",
    );
    let resolved = resolve_imports(src, dir.path()).unwrap();
    assert!(resolved.markdown.contains("text"));
}

#[test]
fn test_section_extraction() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "guide.md",
        "# Intro\nhello\n## Setup\nsetup body\nmore setup\n## Teardown\nbye",
    );
    let src = source("name: demo", "@include guide.md#Setup");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    assert!(resolved.markdown.contains("setup body"));
    assert!(resolved.markdown.contains("more setup"));
    assert!(!resolved.markdown.contains("bye"));
    assert!(!resolved.markdown.contains("hello"));
}

#[test]
fn test_section_not_found_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "guide.md", "# Intro\nhello");
    let src = source("name: demo", "@include guide.md#Missing");
    let err = resolve_imports(src, dir.path()).unwrap_err();
    assert!(err.to_string().contains("section '#Missing' not found"));
}

#[test]
fn test_nested_include_resolves_relative_to_includer() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "sub/inner.md", "inner text");
    write(dir.path(), "sub/outer.md", "@include inner.md");
    let src = source("name: demo", "@include sub/outer.md");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    assert!(resolved.markdown.contains("inner text"));
}

#[test]
fn test_included_frontmatter_tools_merge() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "toolkit.md",
        "---\ntools:\n  web-fetch:\n  playwright:\n    version: v1.41.0\n---\nToolkit docs.",
    );
    let src = source("name: demo\ntools:\n  bash: [\"ls\"]", "@include toolkit.md");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    let tools = resolved
        .frontmatter
        .get("tools")
        .and_then(|v| v.as_mapping())
        .unwrap();
    assert!(tools.contains_key("bash"));
    assert!(tools.contains_key("web-fetch"));
    assert!(tools.contains_key("playwright"));
}

#[test]
fn test_main_file_wins_on_tool_conflict() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "toolkit.md",
        "---\ntools:\n  playwright:\n    version: imported\n---\n",
    );
    let src = source(
        "name: demo\ntools:\n  playwright:\n    version: main",
        "@include toolkit.md",
    );
    let resolved = resolve_imports(src, dir.path()).unwrap();
    let version = resolved.frontmatter["tools"]["playwright"]["version"]
        .as_str()
        .unwrap();
    assert_eq!(version, "main");
}

#[test]
fn test_frontmatter_imports_list() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "policy.md",
        "---\nnetwork: defaults\n---\nPolicy text.",
    );
    let src = source("name: demo\nimports:\n  - policy.md", "Main body.");
    let resolved = resolve_imports(src, dir.path()).unwrap();
    assert!(resolved.markdown.contains("Main body."));
    assert!(resolved.markdown.contains("Policy text."));
    assert_eq!(
        resolved.frontmatter.get("network").and_then(|v| v.as_str()),
        Some("defaults")
    );
    assert!(!resolved.frontmatter.contains_key("imports"));
}

#[test]
fn test_imported_steps_precede_main_steps() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "setup.md",
        "---\nsteps:\n  - name: imported\n    run: echo imported\n---\n",
    );
    let src = source(
        "name: demo\nsteps:\n  - name: main\n    run: echo main",
        "@include setup.md",
    );
    let resolved = resolve_imports(src, dir.path()).unwrap();
    let steps = parse_steps_from_frontmatter(resolved.frontmatter.get("steps").unwrap()).unwrap();
    assert_eq!(steps.pre_agent.len(), 2);
    assert_eq!(
        steps.pre_agent[0].get("name").and_then(|v| v.as_str()),
        Some("imported")
    );
}
