//! The activation job: role gating, command matching, and the optional
//! reaction on the triggering item.

use anyhow::Result;
use std::collections::BTreeMap;

use fl_config::AiReaction;
use fl_emit::YamlBuilder;

use crate::context::BuildContext;
use crate::job::{Job, JobPermissions};
use crate::steps_util::github_script_step;

pub fn build_activation(ctx: &BuildContext) -> Result<Job> {
    let spec = ctx.spec;
    let mut job = Job::new("activation");
    job.timeout_minutes = Some(5);

    let with_reaction = spec.reaction != AiReaction::None;
    job.permissions = if with_reaction {
        Some(JobPermissions::scoped(&[
            ("contents", "read"),
            ("issues", "write"),
            ("pull-requests", "write"),
        ]))
    } else {
        Some(JobPermissions::scoped(&[("contents", "read")]))
    };

    if let Some(command) = &spec.command {
        // Command workflows fire on every comment; only proceed when the
        // body carries the command, or the event is not a comment at all.
        job.if_cond = Some(format!(
            "github.event_name != 'issue_comment' || contains(github.event.comment.body, '/{command}')"
        ));
    }

    if spec.roles != ["all"] {
        job.steps.push(role_check_step(&spec.roles));
    }

    if with_reaction {
        let mut env = BTreeMap::new();
        env.insert(
            "GH_AW_REACTION".to_string(),
            format!("\"{}\"", spec.reaction.as_str()),
        );
        job.steps.push(github_script_step(
            "Add reaction to the triggering item",
            Some("reaction"),
            None,
            &env,
            None,
            "update_reaction",
            ctx.minify_runner,
        )?);
        job.outputs.push((
            "reaction_id".to_string(),
            "${{ steps.reaction.outputs.reaction_id }}".to_string(),
        ));
    }

    if job.steps.is_empty() {
        // A job with no steps is invalid; keep a visible no-op.
        let mut b = YamlBuilder::new();
        b.line(6, "- name: Record activation");
        b.line(8, "run: echo \"workflow activated\"");
        job.steps.push(b.finish().trim_end().to_string());
    }

    Ok(job)
}

fn role_check_step(roles: &[String]) -> String {
    let mut b = YamlBuilder::new();
    b.line(6, "- name: Check triggering actor role");
    b.line(8, "env:");
    b.line(10, "GH_TOKEN: ${{ secrets.GITHUB_TOKEN }}");
    b.line(8, "run: |");
    b.line(
        10,
        "PERMISSION=$(gh api \"/repos/${{ github.repository }}/collaborators/${{ github.actor }}/permission\" --jq .permission)",
    );
    b.line(10, "case \"$PERMISSION\" in");
    b.line(10, &format!("  {}) ;;", role_case_patterns(roles)));
    b.line(10, "  *)");
    b.line(
        10,
        "    echo \"error: actor '${{ github.actor }}' lacks a permitted role ($PERMISSION)\" >&2",
    );
    b.line(10, "    exit 1");
    b.line(10, "    ;;");
    b.line(10, "esac");
    b.finish().trim_end().to_string()
}

fn role_case_patterns(roles: &[String]) -> String {
    // GitHub's permission probe reports admin/maintain/write/triage/read.
    roles
        .iter()
        .map(|r| match r.as_str() {
            "maintainer" => "maintain".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|")
}
