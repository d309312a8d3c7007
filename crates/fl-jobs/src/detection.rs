//! The threat-detection job, interposed between the agent and the sinks.

use anyhow::Result;
use std::collections::BTreeMap;

use fl_emit::{YamlBuilder, render_step_value};
use fl_pins::get_action_pin;

use crate::context::BuildContext;
use crate::job::{Job, JobPermissions};
use crate::steps_util::{github_script_step, write_agent_output_step};

/// Build the `detection` job, or `None` when threat detection is off.
pub fn build_detection(ctx: &BuildContext) -> Result<Option<Job>> {
    let Some(config) = ctx
        .spec
        .safe_outputs
        .as_ref()
        .and_then(|so| so.threat_detection.as_ref())
        .filter(|td| td.enabled)
    else {
        return Ok(None);
    };

    let mut job = Job::new("detection");
    job.needs.push("agent".to_string());
    job.if_cond = Some("needs.agent.result == 'success'".to_string());
    job.permissions = Some(JobPermissions::scoped(&[("contents", "read")]));
    job.timeout_minutes = Some(10);

    job.steps.push(write_agent_output_step());
    job.steps.push(download_patch_step());

    let mut env = BTreeMap::new();
    env.insert(
        "GH_AW_AGENT_OUTPUT".to_string(),
        crate::steps_util::AGENT_OUTPUT_FILE.to_string(),
    );
    if let Some(prompt) = &config.prompt {
        env.insert(
            "GH_AW_THREAT_PROMPT".to_string(),
            fl_emit::yaml_quote(prompt),
        );
    }
    job.steps.push(github_script_step(
        "Scan agent outputs for threats",
        Some("detection"),
        None,
        &env,
        None,
        "threat_detection",
        ctx.minify_runner,
    )?);

    for step in &config.steps {
        job.steps.push(render_step_value(step)?);
    }

    job.outputs.push((
        "threats_detected".to_string(),
        "${{ steps.detection.outputs.threats_detected }}".to_string(),
    ));
    Ok(Some(job))
}

fn download_patch_step() -> String {
    let mut b = YamlBuilder::new();
    b.line(6, "- name: Download repository patch");
    b.line(8, "if: needs.agent.outputs.has_patch == 'true'");
    b.line(
        8,
        &format!("uses: {}", get_action_pin("actions/download-artifact", "v5")),
    );
    b.line(8, "with:");
    b.line(10, "pattern: \"*-agent-artifacts\"");
    b.line(10, "path: /tmp/gh-aw/");
    b.finish().trim_end().to_string()
}
