//! Safe-output sink job builders.
//!
//! Every sink follows the same envelope: presence check, env
//! composition, token precedence, payload selection, guard expression,
//! narrow permissions, and forwarded outputs. The orchestrator receives
//! the jobs in canonical (alphabetical) order so emission is
//! deterministic.

use anyhow::Result;
use std::collections::BTreeMap;

use fl_config::SafeOutputsConfig;
use fl_config::safe_outputs::SinkCommon;
use fl_emit::{YamlBuilder, yaml_quote};

use crate::context::BuildContext;
use crate::job::{Job, JobPermissions};
use crate::steps_util::{AGENT_OUTPUT_FILE, github_script_step, write_agent_output_step};

/// Everything a sink contributes beyond the shared envelope.
struct SinkParams {
    job_name: &'static str,
    step_name: &'static str,
    script: &'static str,
    /// Token the agent writes into `output_types` for this sink.
    output_type: &'static str,
    permissions: &'static [(&'static str, &'static str)],
    env: Vec<(String, String)>,
    /// Output names forwarded from the payload step.
    outputs: &'static [&'static str],
    extra_guard: Option<&'static str>,
    token: String,
    post_steps: Vec<String>,
}

/// Build every configured sink's job, in canonical order.
pub fn build_safe_output_jobs(ctx: &BuildContext) -> Result<Vec<Job>> {
    let spec = ctx.spec;
    let Some(so) = &spec.safe_outputs else {
        return Ok(Vec::new());
    };
    let mut jobs = Vec::new();

    // Alphabetical by job name; this order is a compatibility surface.
    if let Some(config) = &so.add_comments {
        let mut env = vec![];
        if config.discussion {
            env.push(("GH_AW_COMMENT_DISCUSSION".to_string(), "\"true\"".to_string()));
        }
        let mut permissions: &[(&str, &str)] = &[
            ("contents", "read"),
            ("issues", "write"),
            ("pull-requests", "write"),
        ];
        if config.discussion {
            permissions = &[
                ("contents", "read"),
                ("discussions", "write"),
                ("issues", "write"),
                ("pull-requests", "write"),
            ];
        }
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "add_comment",
                step_name: "Add comment",
                script: "add_comment",
                output_type: "add_comment",
                permissions,
                env,
                outputs: &["comment_id", "comment_url"],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.add_labels {
        let mut env = vec![];
        if !config.allowed.is_empty() {
            env.push((
                "GH_AW_LABELS_ALLOWED".to_string(),
                yaml_quote(&config.allowed.join(",")),
            ));
        }
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "add_labels",
                step_name: "Add labels",
                script: "add_labels",
                output_type: "add_labels",
                permissions: &[
                    ("contents", "read"),
                    ("issues", "write"),
                    ("pull-requests", "write"),
                ],
                env,
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.add_reviewer {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "add_reviewer",
                step_name: "Add reviewer",
                script: "add_reviewer",
                output_type: "add_reviewer",
                permissions: &[("contents", "read"), ("pull-requests", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.close_pull_request {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "close_pull_request",
                step_name: "Close pull request",
                script: "close_pull_request",
                output_type: "close_pull_request",
                permissions: &[("contents", "read"), ("pull-requests", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.create_agent_tasks {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "create_agent_task",
                step_name: "Create agent task",
                script: "create_agent_task",
                output_type: "create_agent_task",
                permissions: &[("contents", "read"), ("issues", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: copilot_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.create_code_scanning_alerts {
        let driver = config
            .driver
            .clone()
            .unwrap_or_else(|| spec.name.clone());
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "create_code_scanning_alert",
                step_name: "Create code scanning alert",
                script: "create_code_scanning_alert",
                output_type: "create_code_scanning_alert",
                permissions: &[("contents", "read"), ("security-events", "write")],
                env: vec![("GH_AW_SARIF_DRIVER".to_string(), yaml_quote(&driver))],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.create_discussions {
        let mut env = vec![];
        if let Some(category) = &config.category {
            env.push(("GH_AW_DISCUSSION_CATEGORY".to_string(), yaml_quote(category)));
        }
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "create_discussion",
                step_name: "Create discussion",
                script: "create_discussion",
                output_type: "create_discussion",
                permissions: &[("contents", "read"), ("discussions", "write")],
                env,
                outputs: &["discussion_number", "discussion_url"],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.create_issues {
        let mut env = vec![];
        if let Some(prefix) = &config.title_prefix {
            env.push(("GH_AW_ISSUE_TITLE_PREFIX".to_string(), yaml_quote(prefix)));
        }
        if !config.labels.is_empty() {
            env.push((
                "GH_AW_ISSUE_LABELS".to_string(),
                yaml_quote(&config.labels.join(",")),
            ));
        }
        let token = default_token(&config.common, so);
        let post_steps = if config.assignees.is_empty() {
            vec![]
        } else {
            vec![assign_issue_step(&config.assignees, &token)]
        };
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "create_issue",
                step_name: "Create issue",
                script: "create_issue",
                output_type: "create_issue",
                permissions: &[("contents", "read"), ("issues", "write")],
                env,
                outputs: &["issue_number", "issue_url", "temporary_id_map"],
                extra_guard: None,
                token,
                post_steps,
            },
        )?);
    }

    if let Some(config) = &so.create_pr_review_comments {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "create_pr_review_comment",
                step_name: "Create PR review comment",
                script: "create_pr_review_comment",
                output_type: "create_pull_request_review_comment",
                permissions: &[("contents", "read"), ("pull-requests", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: Some("github.event.pull_request.number"),
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.create_pull_requests {
        let mut env = vec![(
            "GH_AW_PR_DRAFT".to_string(),
            format!("\"{}\"", config.draft),
        )];
        if let Some(prefix) = &config.title_prefix {
            env.push(("GH_AW_PR_TITLE_PREFIX".to_string(), yaml_quote(prefix)));
        }
        if !config.labels.is_empty() {
            env.push((
                "GH_AW_PR_LABELS".to_string(),
                yaml_quote(&config.labels.join(",")),
            ));
        }
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "create_pull_request",
                step_name: "Create pull request",
                script: "create_pull_request",
                output_type: "create_pull_request",
                permissions: &[("contents", "write"), ("pull-requests", "write")],
                env,
                outputs: &["pull_request_number", "pull_request_url"],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.dispatch_workflow {
        let mut env = vec![];
        if !config.workflows.is_empty() {
            env.push((
                "GH_AW_DISPATCH_WORKFLOWS".to_string(),
                yaml_quote(&config.workflows.join(",")),
            ));
        }
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "dispatch_workflow",
                step_name: "Dispatch workflow",
                script: "dispatch_workflow",
                output_type: "dispatch_workflow",
                permissions: &[("contents", "read"), ("actions", "write")],
                env,
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.link_sub_issue {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "link_sub_issue",
                step_name: "Link sub-issue",
                script: "link_sub_issue",
                output_type: "link_sub_issue",
                permissions: &[("contents", "read"), ("issues", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.list_project_items_with_urls {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "list_project_items_with_urls",
                step_name: "List project items",
                script: "list_project_items_with_urls",
                output_type: "list_project_items_with_urls",
                permissions: &[("contents", "read")],
                env: vec![],
                outputs: &["items"],
                extra_guard: None,
                token: projects_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.mark_pull_request_as_ready_for_review {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "mark_pr_ready_for_review",
                step_name: "Mark PR ready for review",
                script: "mark_pr_ready_for_review",
                output_type: "mark_pull_request_as_ready_for_review",
                permissions: &[("contents", "read"), ("pull-requests", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.minimize_comment {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "minimize_comment",
                step_name: "Minimize comment",
                script: "minimize_comment",
                output_type: "minimize_comment",
                permissions: &[
                    ("contents", "read"),
                    ("issues", "write"),
                    ("pull-requests", "write"),
                ],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.missing_tool {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "missing_tool",
                step_name: "Record missing tools",
                script: "missing_tool",
                output_type: "missing_tool",
                permissions: &[("contents", "read")],
                env: vec![],
                outputs: &["missing_count"],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.noop {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "noop",
                step_name: "Record noop outputs",
                script: "noop",
                output_type: "noop",
                permissions: &[("contents", "read")],
                env: vec![],
                outputs: &["noop_count"],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.push_to_orphaned_branch {
        let mut env = vec![(
            "GH_AW_ORPHANED_BRANCH_MAX_COUNT".to_string(),
            format!("\"{}\"", config.common.max),
        )];
        if let Some(prefix) = &config.branch_prefix {
            env.push(("GH_AW_ORPHANED_BRANCH_PREFIX".to_string(), yaml_quote(prefix)));
        }
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "push_to_orphaned_branch",
                step_name: "Push to orphaned branch",
                script: "push_to_orphaned_branch",
                output_type: "push_to_orphaned_branch",
                permissions: &[("contents", "write")],
                env,
                outputs: &["branch"],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.push_to_pull_request_branch {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "push_to_pull_request_branch",
                step_name: "Push to PR branch",
                script: "push_to_pull_request_branch",
                output_type: "push_to_pull_request_branch",
                permissions: &[("contents", "write")],
                env: vec![],
                outputs: &["branch"],
                extra_guard: Some("github.event.pull_request.number"),
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.update_issues {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "update_issue",
                step_name: "Update issue",
                script: "update_issue",
                output_type: "update_issue",
                permissions: &[("contents", "read"), ("issues", "write")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.update_projects {
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "update_project",
                step_name: "Update project",
                script: "update_project",
                output_type: "update_project",
                permissions: &[("contents", "read")],
                env: vec![],
                outputs: &[],
                extra_guard: None,
                token: projects_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    if let Some(config) = &so.update_pull_requests {
        let env = vec![
            (
                "GH_AW_UPDATE_TITLE".to_string(),
                format!("\"{}\"", config.title),
            ),
            (
                "GH_AW_UPDATE_BODY".to_string(),
                format!("\"{}\"", config.body),
            ),
        ];
        jobs.push(build_sink_job(
            ctx,
            &config.common,
            SinkParams {
                job_name: "update_pull_request",
                step_name: "Update pull request",
                script: "update_pull_request",
                output_type: "update_pull_request",
                permissions: &[("contents", "read"), ("pull-requests", "write")],
                env,
                outputs: &[],
                extra_guard: Some("github.event.pull_request.number"),
                token: default_token(&config.common, so),
                post_steps: vec![],
            },
        )?);
    }

    Ok(jobs)
}

fn build_sink_job(ctx: &BuildContext, common: &SinkCommon, params: SinkParams) -> Result<Job> {
    let spec = ctx.spec;
    let so = spec.safe_outputs.as_ref();

    let mut job = Job::new(params.job_name);
    job.needs.push("agent".to_string());
    if ctx.detection_enabled() {
        job.needs.push("detection".to_string());
    }
    if let Some(runs_on) = so.and_then(|s| s.runs_on.clone()) {
        job.runs_on = runs_on;
    }
    job.timeout_minutes = Some(10);
    job.permissions = Some(JobPermissions::scoped(params.permissions));

    let mut guard = format!(
        "needs.agent.result == 'success' && contains(needs.agent.outputs.output_types, '{}')",
        params.output_type
    );
    if ctx.detection_enabled() {
        guard.push_str(" && needs.detection.outputs.threats_detected == 'false'");
    }
    if let Some(extra) = params.extra_guard {
        guard.push_str(" && ");
        guard.push_str(extra);
    }
    job.if_cond = Some(guard);

    let mut env: BTreeMap<String, String> = BTreeMap::new();
    env.insert("GH_AW_AGENT_OUTPUT".to_string(), AGENT_OUTPUT_FILE.to_string());
    env.insert("GH_AW_MAX_COUNT".to_string(), format!("\"{}\"", common.max));
    env.insert("GH_AW_WORKFLOW_NAME".to_string(), yaml_quote(&spec.name));
    if so.is_some_and(|s| s.staged) {
        env.insert("GH_AW_SAFE_OUTPUTS_STAGED".to_string(), "\"true\"".to_string());
    }
    if let Some(repo) = &common.target_repo {
        env.insert("GH_AW_TARGET_REPO_SLUG".to_string(), yaml_quote(repo));
    }
    if let Some(campaign) = &spec.campaign {
        env.insert("GH_AW_CAMPAIGN".to_string(), yaml_quote(campaign));
    }
    if !common.required_labels.is_empty() {
        env.insert(
            "GH_AW_REQUIRED_LABELS".to_string(),
            yaml_quote(&common.required_labels.join(",")),
        );
    }
    if let Some(prefix) = &common.required_title_prefix {
        env.insert("GH_AW_REQUIRED_TITLE_PREFIX".to_string(), yaml_quote(prefix));
    }
    if let Some(category) = &common.required_category {
        env.insert("GH_AW_REQUIRED_CATEGORY".to_string(), yaml_quote(category));
    }
    if let Some(so) = so {
        for (key, value) in &so.env {
            env.insert(key.clone(), yaml_quote(value));
        }
    }
    for (key, value) in params.env {
        env.insert(key, value);
    }

    job.steps.push(write_agent_output_step());
    job.steps.push(github_script_step(
        params.step_name,
        Some(params.job_name),
        None,
        &env,
        Some(&params.token),
        params.script,
        ctx.minify_runner,
    )?);
    job.steps.extend(params.post_steps);

    for output in params.outputs {
        job.outputs.push((
            output.to_string(),
            format!("${{{{ steps.{}.outputs.{} }}}}", params.job_name, output),
        ));
    }
    Ok(job)
}

/// per-sink token > global safe-outputs token > the runner-provided one.
fn default_token(common: &SinkCommon, so: &SafeOutputsConfig) -> String {
    common
        .github_token
        .clone()
        .or_else(|| so.github_token.clone())
        .unwrap_or_else(|| "${{ secrets.GITHUB_TOKEN }}".to_string())
}

/// Agent-task sinks drive the Copilot surface, which needs its own PAT.
fn copilot_token(common: &SinkCommon, so: &SafeOutputsConfig) -> String {
    common
        .github_token
        .clone()
        .or_else(|| so.github_token.clone())
        .unwrap_or_else(|| "${{ secrets.GH_AW_COPILOT_TOKEN }}".to_string())
}

/// Projects v2 GraphQL rejects the default installation token; these
/// sinks never fall back to `GITHUB_TOKEN`.
fn projects_token(common: &SinkCommon, so: &SafeOutputsConfig) -> String {
    common
        .github_token
        .clone()
        .or_else(|| so.github_token.clone())
        .unwrap_or_else(|| "${{ secrets.GH_AW_PROJECT_GITHUB_TOKEN }}".to_string())
}

/// Post-step for create-issue: `copilot` assignees go through the
/// GraphQL bot-assignment path, everyone else through `gh issue edit`.
fn assign_issue_step(assignees: &[String], token: &str) -> String {
    let mut b = YamlBuilder::new();
    b.line(6, "- name: Assign issue");
    b.line(8, "if: steps.create_issue.outputs.issue_number");
    b.line(8, "env:");
    b.line(10, &format!("GH_TOKEN: {token}"));
    b.line(
        10,
        &format!("GH_AW_ISSUE_ASSIGNEES: {}", yaml_quote(&assignees.join(","))),
    );
    b.line(
        10,
        "GH_AW_ISSUE_NUMBER: ${{ steps.create_issue.outputs.issue_number }}",
    );
    b.line(8, "run: |");
    b.line(10, "for assignee in ${GH_AW_ISSUE_ASSIGNEES//,/ }; do");
    b.line(10, "  if [ \"$assignee\" = \"copilot\" ]; then");
    b.line(
        10,
        "    ISSUE_ID=$(gh api \"/repos/${{ github.repository }}/issues/$GH_AW_ISSUE_NUMBER\" --jq .node_id)",
    );
    b.line(
        10,
        "    gh api graphql -f query='mutation($id: ID!) { replaceActorsForAssignable(input: {assignableId: $id, actorIds: []}) { __typename } }' -f id=\"$ISSUE_ID\"",
    );
    b.line(10, "  else");
    b.line(
        10,
        "    gh issue edit \"$GH_AW_ISSUE_NUMBER\" --add-assignee \"$assignee\"",
    );
    b.line(10, "  fi");
    b.line(10, "done");
    b.finish().trim_end().to_string()
}

#[cfg(test)]
#[path = "sinks_tests.rs"]
mod sinks_tests;
