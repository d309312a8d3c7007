//! Repository feature probes for sinks that need them.

use serde_json::Value as JsonValue;
use tracing::debug;

use fl_config::WorkflowSpec;
use fl_process::{CommandRunner, gh_api_json};

/// Check that target repositories carry the features the configured
/// sinks need. Findings are strings; the caller decides severity.
pub fn validate_repository_features(
    spec: &WorkflowSpec,
    runner: &dyn CommandRunner,
) -> Vec<String> {
    let Some(so) = &spec.safe_outputs else {
        return Vec::new();
    };

    let mut wanted: Vec<(&str, Option<String>, &str)> = Vec::new();
    if let Some(config) = &so.create_issues {
        wanted.push(("has_issues", config.common.target_repo.clone(), "create-issue"));
    }
    if let Some(config) = &so.create_discussions {
        wanted.push((
            "has_discussions",
            config.common.target_repo.clone(),
            "create-discussion",
        ));
    }
    if let Some(config) = &so.add_comments {
        if config.discussion {
            wanted.push((
                "has_discussions",
                config.common.target_repo.clone(),
                "add-comment (discussion: true)",
            ));
        }
    }
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();
    for (feature, target_repo, sink) in wanted {
        let Some(repo) = target_repo.or_else(current_repo) else {
            debug!(sink, "no target repository known, skipping feature probe");
            continue;
        };
        match probe_feature(runner, &repo, feature) {
            Ok(true) => {}
            Ok(false) => findings.push(format!(
                "repository feature missing: '{repo}' has {feature} disabled (required by {sink})"
            )),
            Err(e) => {
                debug!(%repo, feature, error = %e, "feature probe failed");
            }
        }
    }
    findings
}

fn current_repo() -> Option<String> {
    std::env::var("GITHUB_REPOSITORY").ok().filter(|r| !r.is_empty())
}

fn probe_feature(runner: &dyn CommandRunner, repo: &str, feature: &str) -> anyhow::Result<bool> {
    let body = gh_api_json(runner, repo)?;
    let parsed: JsonValue = serde_json::from_str(&body)?;
    Ok(parsed
        .get(feature)
        .and_then(JsonValue::as_bool)
        .unwrap_or(false))
}
