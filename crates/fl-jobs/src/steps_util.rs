//! Step-block construction helpers shared by the job builders.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;

use fl_emit::{YamlBuilder, embed_js};
use fl_pins::get_action_pin;
use fl_process::CommandRunner;

/// Path where sink jobs materialize the agent's collected output.
pub(crate) const AGENT_OUTPUT_FILE: &str = "/tmp/gh-aw/agent_output.json";

/// A `uses: actions/github-script` step wrapping an embedded payload.
pub(crate) fn github_script_step(
    name: &str,
    id: Option<&str>,
    step_if: Option<&str>,
    env: &BTreeMap<String, String>,
    github_token: Option<&str>,
    script_name: &str,
    minify_runner: Option<&dyn CommandRunner>,
) -> Result<String> {
    let source = fl_engine::get_script(script_name)
        .ok_or_else(|| anyhow!("no embedded script named '{script_name}'"))?;
    let mut b = YamlBuilder::new();
    b.line(6, &format!("- name: {name}"));
    if let Some(id) = id {
        b.line(8, &format!("id: {id}"));
    }
    if let Some(cond) = step_if {
        b.line(8, &format!("if: {cond}"));
    }
    b.line(8, &format!("uses: {}", get_action_pin("actions/github-script", "v8")));
    if !env.is_empty() {
        b.line(8, "env:");
        for (key, value) in env {
            b.line(10, &format!("{key}: {value}"));
        }
    }
    b.line(8, "with:");
    if let Some(token) = github_token {
        b.line(10, &format!("github-token: {token}"));
    }
    b.line(10, "script: |");
    b.raw(&embed_js(source, minify_runner));
    b.raw("\n");
    Ok(b.finish().trim_end().to_string())
}

/// The "Write agent output" run step: rehydrates the agent's collected
/// output JSON into a file for the payload to read.
pub(crate) fn write_agent_output_step() -> String {
    let mut b = YamlBuilder::new();
    b.line(6, "- name: Write agent output");
    b.line(8, "env:");
    b.line(10, "GH_AW_AGENT_OUTPUT_JSON: ${{ needs.agent.outputs.output }}");
    b.line(8, "run: |");
    b.line(10, "mkdir -p /tmp/gh-aw");
    b.line(
        10,
        &format!("printf '%s' \"$GH_AW_AGENT_OUTPUT_JSON\" > {AGENT_OUTPUT_FILE}"),
    );
    b.finish().trim_end().to_string()
}
