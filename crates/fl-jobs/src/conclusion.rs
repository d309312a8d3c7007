//! The conclusion job: posts the final status back to the activation
//! comment.

use anyhow::Result;
use std::collections::BTreeMap;

use fl_config::AiReaction;

use crate::context::BuildContext;
use crate::job::{Job, JobPermissions};
use crate::steps_util::github_script_step;

/// Build the `conclusion` job, or `None` when no compatible surface is
/// configured.
///
/// Present when a conclusion-compatible sink (add-comment/noop) or a
/// command trigger is configured; a reaction of `none` suppresses only
/// the reaction, not the conclusion.
pub fn build_conclusion(
    ctx: &BuildContext,
    safe_output_job_names: &[String],
) -> Result<Option<Job>> {
    let spec = ctx.spec;
    let compatible_sink = spec
        .safe_outputs
        .as_ref()
        .is_some_and(|so| so.supports_conclusion());
    if !compatible_sink && !spec.has_command_trigger() {
        return Ok(None);
    }

    let mut job = Job::new("conclusion");
    job.needs.push("activation".to_string());
    job.needs.push("agent".to_string());
    for name in safe_output_job_names {
        job.needs.push(name.clone());
    }
    job.if_cond = Some("always()".to_string());
    job.permissions = Some(JobPermissions::scoped(&[
        ("contents", "read"),
        ("issues", "write"),
        ("pull-requests", "write"),
    ]));
    job.timeout_minutes = Some(5);

    let mut env = BTreeMap::new();
    env.insert(
        "GH_AW_AGENT_RESULT".to_string(),
        "${{ needs.agent.result }}".to_string(),
    );
    if spec.reaction != AiReaction::None {
        env.insert(
            "GH_AW_ACTIVATION_COMMENT_ID".to_string(),
            "${{ needs.activation.outputs.reaction_id }}".to_string(),
        );
    }
    job.steps.push(github_script_step(
        "Report workflow conclusion",
        Some("conclusion"),
        None,
        &env,
        None,
        "conclusion",
        ctx.minify_runner,
    )?);
    Ok(Some(job))
}
