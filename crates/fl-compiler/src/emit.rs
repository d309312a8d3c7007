//! Lock-file assembly: preludes, the job graph, and custom jobs.

use anyhow::{Context, Result};
use serde_yaml::Value;
use sha2::{Digest, Sha256};

use fl_config::WorkflowSpec;
use fl_emit::{YamlBuilder, yaml_quote};
use fl_jobs::JobGraph;

/// Render the complete lock file into memory.
pub fn render_lock_file(
    spec: &WorkflowSpec,
    graph: &JobGraph,
    version_stamp: &str,
) -> Result<String> {
    let mut b = YamlBuilder::new();
    b.line(0, "# This file was automatically generated by flowlock. DO NOT EDIT.");
    b.line(0, "# To change the workflow, edit the source .md file and recompile.");
    b.line(0, &format!("# {version_stamp}"));
    let fingerprint = spec
        .fingerprint
        .clone()
        .unwrap_or_else(|| source_digest(spec));
    b.line(0, &format!("# fingerprint: {fingerprint}"));
    b.blank();
    b.line(0, &format!("name: {}", yaml_quote(&spec.name)));
    b.blank();
    render_yaml_key(&mut b, "on", &spec.on)?;
    b.blank();
    render_yaml_key(&mut b, "permissions", &spec.permissions)?;
    b.blank();
    b.raw(&fl_jobs::derive_concurrency(spec));
    b.blank();
    b.raw(&graph.render());
    render_custom_jobs(&mut b, spec)?;
    Ok(b.finish())
}

/// Short content digest over the prompt body, for drift tracing.
fn source_digest(spec: &WorkflowSpec) -> String {
    let mut hasher = Sha256::new();
    hasher.update(spec.name.as_bytes());
    hasher.update([0]);
    hasher.update(spec.markdown.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Emit `key:` followed by an arbitrary YAML value at two-space indent.
fn render_yaml_key(b: &mut YamlBuilder, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => b.line(0, &format!("{key}:")),
        Value::String(s) => b.line(0, &format!("{key}: {s}")),
        Value::Mapping(map) if map.is_empty() => b.line(0, &format!("{key}: {{}}")),
        other => {
            let text = serde_yaml::to_string(other)
                .with_context(|| format!("cannot render '{key}' block"))?;
            b.line(0, &format!("{key}:"));
            b.block(2, text.trim_end());
        }
    }
    Ok(())
}

/// User-declared custom jobs are appended verbatim after the
/// synthesized graph.
fn render_custom_jobs(b: &mut YamlBuilder, spec: &WorkflowSpec) -> Result<()> {
    let Some(so) = &spec.safe_outputs else {
        return Ok(());
    };
    for (name, job) in &so.custom_jobs {
        let text =
            serde_yaml::to_string(job).with_context(|| format!("cannot render custom job '{name}'"))?;
        b.line(2, &format!("{name}:"));
        b.block(4, text.trim_end());
    }
    Ok(())
}
