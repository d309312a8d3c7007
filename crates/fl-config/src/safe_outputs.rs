//! Safe-output sink configuration (`safe-outputs:` front matter).
//!
//! Every sink shares the same envelope: `max`, `github-token`, target
//! scoping, and filter predicates. Sink-specific fields sit on their own
//! structs. A sub-parser failure surfaces as `InvalidSafeOutputConfig`
//! naming the sink.

use anyhow::{Result, anyhow, bail};
use serde_yaml::Value;
use std::collections::BTreeMap;

use fl_core::CompileError;

use crate::numeric::as_u64;

/// Valid `safe-outputs:` keys, kept sorted for the unknown-key error.
pub const VALID_SINK_KEYS: &[&str] = &[
    "add-comment",
    "add-labels",
    "add-reviewer",
    "close-pull-request",
    "create-agent-task",
    "create-code-scanning-alert",
    "create-discussion",
    "create-issue",
    "create-pull-request",
    "create-pull-request-review-comment",
    "dispatch-workflow",
    "hide-comment",
    "link-sub-issue",
    "list-project-items-with-urls",
    "mark-pull-request-as-ready-for-review",
    "minimize-comment",
    "missing-tool",
    "noop",
    "push-to-orphaned-branch",
    "push-to-pull-request-branch",
    "threat-detection",
    "update-issue",
    "update-project",
    "update-pull-request",
];

/// Non-sink keys accepted under `safe-outputs:`.
const GLOBAL_KEYS: &[&str] = &["staged", "runs-on", "github-token", "env", "jobs"];

/// Target scoping shared by most sinks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetConfig {
    /// Apply to the item that triggered the workflow.
    #[default]
    Triggering,
    /// The agent names the target explicitly in its output.
    Any,
    /// A fixed issue/PR/discussion number.
    Explicit(u64),
}

/// Envelope fields shared by every sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCommon {
    pub max: u64,
    pub github_token: Option<String>,
    pub target: TargetConfig,
    /// Cross-repository target as `owner/repo`.
    pub target_repo: Option<String>,
    pub required_labels: Vec<String>,
    pub required_title_prefix: Option<String>,
    pub required_category: Option<String>,
}

impl SinkCommon {
    fn with_max(max: u64) -> Self {
        Self {
            max,
            github_token: None,
            target: TargetConfig::default(),
            target_repo: None,
            required_labels: Vec::new(),
            required_title_prefix: None,
            required_category: None,
        }
    }
}

/// A sink with no fields beyond the shared envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleSinkConfig {
    pub common: SinkCommon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIssuesConfig {
    pub common: SinkCommon,
    pub title_prefix: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCommentsConfig {
    pub common: SinkCommon,
    /// Allow commenting on discussions (requires the Discussions feature).
    pub discussion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequestsConfig {
    pub common: SinkCommon,
    pub title_prefix: Option<String>,
    pub labels: Vec<String>,
    pub draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePullRequestsConfig {
    pub common: SinkCommon,
    /// Whether the agent may update the PR title.
    pub title: bool,
    /// Whether the agent may update the PR body.
    pub body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDiscussionsConfig {
    pub common: SinkCommon,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLabelsConfig {
    pub common: SinkCommon,
    /// Labels the agent may add; empty means any existing label.
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchWorkflowConfig {
    pub common: SinkCommon,
    /// Workflow file names the agent may dispatch.
    pub workflows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushToOrphanedBranchConfig {
    pub common: SinkCommon,
    pub branch_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCodeScanningAlertConfig {
    pub common: SinkCommon,
    /// SARIF driver name; defaults to the workflow name at build time.
    pub driver: Option<String>,
}

/// Threat-detection interposer between the agent and the sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatDetectionConfig {
    pub enabled: bool,
    pub prompt: Option<String>,
    pub steps: Vec<Value>,
}

/// The full `safe-outputs:` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafeOutputsConfig {
    pub create_issues: Option<CreateIssuesConfig>,
    pub add_comments: Option<AddCommentsConfig>,
    pub create_pull_requests: Option<CreatePullRequestsConfig>,
    pub update_issues: Option<SimpleSinkConfig>,
    pub update_pull_requests: Option<UpdatePullRequestsConfig>,
    pub create_discussions: Option<CreateDiscussionsConfig>,
    pub add_labels: Option<AddLabelsConfig>,
    pub add_reviewer: Option<SimpleSinkConfig>,
    /// `hide-comment` and `minimize-comment` both land here.
    pub minimize_comment: Option<SimpleSinkConfig>,
    pub dispatch_workflow: Option<DispatchWorkflowConfig>,
    pub push_to_orphaned_branch: Option<PushToOrphanedBranchConfig>,
    pub create_agent_tasks: Option<SimpleSinkConfig>,
    pub update_projects: Option<SimpleSinkConfig>,
    pub list_project_items_with_urls: Option<SimpleSinkConfig>,
    pub link_sub_issue: Option<SimpleSinkConfig>,
    pub missing_tool: Option<SimpleSinkConfig>,
    pub noop: Option<SimpleSinkConfig>,
    pub threat_detection: Option<ThreatDetectionConfig>,
    pub create_code_scanning_alerts: Option<CreateCodeScanningAlertConfig>,
    pub push_to_pull_request_branch: Option<SimpleSinkConfig>,
    pub create_pr_review_comments: Option<SimpleSinkConfig>,
    pub mark_pull_request_as_ready_for_review: Option<SimpleSinkConfig>,
    pub close_pull_request: Option<SimpleSinkConfig>,

    /// Record safe outputs without applying them.
    pub staged: bool,
    pub runs_on: Option<String>,
    pub github_token: Option<String>,
    pub env: BTreeMap<String, String>,
    /// User-declared custom jobs (`safe-outputs.jobs`), kept raw.
    pub custom_jobs: BTreeMap<String, Value>,
}

impl SafeOutputsConfig {
    /// True when any sink (not just globals) is configured.
    pub fn has_any_sink(&self) -> bool {
        self.create_issues.is_some()
            || self.add_comments.is_some()
            || self.create_pull_requests.is_some()
            || self.update_issues.is_some()
            || self.update_pull_requests.is_some()
            || self.create_discussions.is_some()
            || self.add_labels.is_some()
            || self.add_reviewer.is_some()
            || self.minimize_comment.is_some()
            || self.dispatch_workflow.is_some()
            || self.push_to_orphaned_branch.is_some()
            || self.create_agent_tasks.is_some()
            || self.update_projects.is_some()
            || self.list_project_items_with_urls.is_some()
            || self.link_sub_issue.is_some()
            || self.missing_tool.is_some()
            || self.noop.is_some()
            || self.create_code_scanning_alerts.is_some()
            || self.push_to_pull_request_branch.is_some()
            || self.create_pr_review_comments.is_some()
            || self.mark_pull_request_as_ready_for_review.is_some()
            || self.close_pull_request.is_some()
    }

    /// Sinks that push commits need git configured in the agent job.
    pub fn needs_git_commands(&self) -> bool {
        self.create_pull_requests.is_some()
            || self.push_to_pull_request_branch.is_some()
            || self.push_to_orphaned_branch.is_some()
    }

    /// Conclusion-compatible sinks (see the activation/conclusion design).
    pub fn supports_conclusion(&self) -> bool {
        self.add_comments.is_some() || self.noop.is_some()
    }
}

/// Parse the `safe-outputs:` mapping.
pub fn parse_safe_outputs(value: &Value) -> Result<SafeOutputsConfig> {
    let Some(map) = value.as_mapping() else {
        bail!("safe-outputs must be a mapping, got {:?}", value);
    };
    let mut config = SafeOutputsConfig::default();

    for (k, v) in map {
        let Some(key) = k.as_str() else {
            bail!("safe-outputs keys must be strings, got {:?}", k);
        };
        match key {
            "staged" => config.staged = v.as_bool().unwrap_or(false),
            "runs-on" => config.runs_on = v.as_str().map(Into::into),
            "github-token" => config.github_token = v.as_str().map(Into::into),
            "env" => {
                if let Value::Mapping(env_map) = v {
                    for (ek, ev) in env_map {
                        if let (Some(ek), Some(ev)) = (ek.as_str(), ev.as_str()) {
                            config.env.insert(ek.to_string(), ev.to_string());
                        }
                    }
                }
            }
            "jobs" => {
                if let Value::Mapping(jobs) = v {
                    for (jk, jv) in jobs {
                        if let Some(job_name) = jk.as_str() {
                            config.custom_jobs.insert(job_name.to_string(), jv.clone());
                        }
                    }
                }
            }
            sink => parse_sink(&mut config, sink, v)
                .map_err(|e| sink_error(sink, e))?,
        }
    }
    Ok(config)
}

fn sink_error(sink: &str, err: anyhow::Error) -> anyhow::Error {
    // Structured errors (e.g. WildcardTargetRepo) pass through untouched.
    if err.downcast_ref::<CompileError>().is_some() {
        return err;
    }
    CompileError::InvalidSafeOutputConfig {
        sink: sink.to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn parse_sink(config: &mut SafeOutputsConfig, sink: &str, value: &Value) -> Result<()> {
    match sink {
        "create-issue" => {
            let common = parse_common(sink, value, 1)?;
            let map = value.as_mapping();
            config.create_issues = Some(CreateIssuesConfig {
                common,
                title_prefix: get_str(map, "title-prefix"),
                labels: get_str_list(map, "labels")?,
                assignees: get_str_list(map, "assignees")?,
            });
        }
        "add-comment" => {
            config.add_comments = Some(AddCommentsConfig {
                common: parse_common(sink, value, 1)?,
                discussion: get_bool(value.as_mapping(), "discussion", false),
            });
        }
        "create-pull-request" => {
            let map = value.as_mapping();
            config.create_pull_requests = Some(CreatePullRequestsConfig {
                common: parse_common(sink, value, 1)?,
                title_prefix: get_str(map, "title-prefix"),
                labels: get_str_list(map, "labels")?,
                draft: get_bool(map, "draft", true),
            });
        }
        "update-issue" => {
            config.update_issues = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "update-pull-request" => {
            let map = value.as_mapping();
            config.update_pull_requests = Some(UpdatePullRequestsConfig {
                common: parse_common(sink, value, 1)?,
                title: get_bool(map, "title", true),
                body: get_bool(map, "body", true),
            });
        }
        "create-discussion" => {
            config.create_discussions = Some(CreateDiscussionsConfig {
                common: parse_common(sink, value, 1)?,
                category: get_str(value.as_mapping(), "category"),
            });
        }
        "add-labels" => {
            config.add_labels = Some(AddLabelsConfig {
                common: parse_common(sink, value, 3)?,
                allowed: get_str_list(value.as_mapping(), "allowed")?,
            });
        }
        "add-reviewer" => {
            config.add_reviewer = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "hide-comment" | "minimize-comment" => {
            if config.minimize_comment.is_some() {
                return Err(CompileError::ConflictingSinkSettings {
                    sink: sink.to_string(),
                    reason: "hide-comment and minimize-comment configure the same sink; \
                             declare only one"
                        .to_string(),
                }
                .into());
            }
            config.minimize_comment = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 5)?,
            });
        }
        "dispatch-workflow" => {
            config.dispatch_workflow = Some(DispatchWorkflowConfig {
                common: parse_common(sink, value, 1)?,
                workflows: get_str_list(value.as_mapping(), "workflows")?,
            });
        }
        "push-to-orphaned-branch" => {
            config.push_to_orphaned_branch = Some(PushToOrphanedBranchConfig {
                common: parse_common(sink, value, 1)?,
                branch_prefix: get_str(value.as_mapping(), "branch-prefix"),
            });
        }
        "create-agent-task" => {
            config.create_agent_tasks = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "update-project" => {
            config.update_projects = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 10)?,
            });
        }
        "list-project-items-with-urls" => {
            config.list_project_items_with_urls = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "link-sub-issue" => {
            config.link_sub_issue = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 5)?,
            });
        }
        "missing-tool" => {
            config.missing_tool = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 20)?,
            });
        }
        "noop" => {
            config.noop = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "threat-detection" => {
            config.threat_detection = Some(parse_threat_detection(value)?);
        }
        "create-code-scanning-alert" => {
            config.create_code_scanning_alerts = Some(CreateCodeScanningAlertConfig {
                common: parse_common(sink, value, 40)?,
                driver: get_str(value.as_mapping(), "driver"),
            });
        }
        "push-to-pull-request-branch" => {
            config.push_to_pull_request_branch = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "create-pull-request-review-comment" => {
            config.create_pr_review_comments = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 10)?,
            });
        }
        "mark-pull-request-as-ready-for-review" => {
            config.mark_pull_request_as_ready_for_review = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        "close-pull-request" => {
            config.close_pull_request = Some(SimpleSinkConfig {
                common: parse_common(sink, value, 1)?,
            });
        }
        unknown => {
            bail!(
                "unknown safe-outputs key '{unknown}'. Valid keys: {}",
                VALID_SINK_KEYS.join(", ")
            );
        }
    }
    Ok(())
}

/// Parse the shared envelope. `value` may be null (all defaults).
fn parse_common(sink: &str, value: &Value, default_max: u64) -> Result<SinkCommon> {
    let mut common = SinkCommon::with_max(default_max);
    let Some(map) = value.as_mapping() else {
        if value.is_null() {
            return Ok(common);
        }
        bail!("configuration must be null or a mapping, got {:?}", value);
    };

    if let Some(max) = map.get("max") {
        common.max =
            as_u64(max).ok_or_else(|| anyhow!("max must be a non-negative integer"))?;
    }
    common.github_token = get_str(Some(map), "github-token");
    if let Some(target) = map.get("target") {
        common.target = parse_target(target)?;
    }
    if let Some(repo) = map.get("target-repo") {
        let Some(repo) = repo.as_str() else {
            bail!("target-repo must be a string");
        };
        if repo == "*" {
            return Err(CompileError::WildcardTargetRepo(sink.to_string()).into());
        }
        if repo.split('/').count() != 2 || repo.split('/').any(str::is_empty) {
            bail!("target-repo must be 'owner/repo', got '{repo}'");
        }
        common.target_repo = Some(repo.to_string());
    }
    common.required_labels = get_str_list(Some(map), "required-labels")?;
    common.required_title_prefix = get_str(Some(map), "required-title-prefix");
    common.required_category = get_str(Some(map), "required-category");
    Ok(common)
}

fn parse_target(value: &Value) -> Result<TargetConfig> {
    if let Some(s) = value.as_str() {
        return match s {
            "triggering" => Ok(TargetConfig::Triggering),
            "*" => Ok(TargetConfig::Any),
            other => match other.parse::<u64>() {
                Ok(n) => Ok(TargetConfig::Explicit(n)),
                Err(_) => bail!("target must be 'triggering', '*', or a number, got '{other}'"),
            },
        };
    }
    if let Some(n) = as_u64(value) {
        return Ok(TargetConfig::Explicit(n));
    }
    bail!("target must be 'triggering', '*', or a number, got {:?}", value)
}

fn parse_threat_detection(value: &Value) -> Result<ThreatDetectionConfig> {
    match value {
        Value::Bool(enabled) => Ok(ThreatDetectionConfig {
            enabled: *enabled,
            prompt: None,
            steps: Vec::new(),
        }),
        Value::Null => Ok(ThreatDetectionConfig {
            enabled: true,
            prompt: None,
            steps: Vec::new(),
        }),
        Value::Mapping(map) => Ok(ThreatDetectionConfig {
            enabled: map.get("enabled").and_then(|v| v.as_bool()).unwrap_or(true),
            prompt: map.get("prompt").and_then(|v| v.as_str()).map(Into::into),
            steps: match map.get("steps") {
                Some(Value::Sequence(seq)) => seq.clone(),
                _ => Vec::new(),
            },
        }),
        other => bail!("threat-detection must be a bool or mapping, got {:?}", other),
    }
}

fn get_str(map: Option<&serde_yaml::Mapping>, key: &str) -> Option<String> {
    map.and_then(|m| m.get(key)).and_then(|v| v.as_str()).map(Into::into)
}

fn get_bool(map: Option<&serde_yaml::Mapping>, key: &str, default: bool) -> bool {
    map.and_then(|m| m.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

fn get_str_list(map: Option<&serde_yaml::Mapping>, key: &str) -> Result<Vec<String>> {
    match map.and_then(|m| m.get(key)) {
        None => Ok(Vec::new()),
        Some(Value::Sequence(seq)) => {
            let mut out = Vec::with_capacity(seq.len());
            for entry in seq {
                let Some(s) = entry.as_str() else {
                    bail!("{key} entries must be strings, got {:?}", entry);
                };
                out.push(s.to_string());
            }
            Ok(out)
        }
        Some(other) => bail!("{key} must be a sequence, got {:?}", other),
    }
}

#[cfg(test)]
#[path = "safe_outputs_tests.rs"]
mod safe_outputs_tests;
