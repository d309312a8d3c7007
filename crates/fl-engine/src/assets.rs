//! Build-time embedded JavaScript payloads.
//!
//! Each payload is a string constant plus a registry entry keyed by
//! name. The payloads are opaque to the compiler; only embedding and
//! size are its concern.

/// (name, source) pairs for every embedded script.
pub const SCRIPTS: &[(&str, &str)] = &[
    ("create_issue", include_str!("../assets/create_issue.cjs")),
    ("add_comment", include_str!("../assets/add_comment.cjs")),
    (
        "create_pull_request",
        include_str!("../assets/create_pull_request.cjs"),
    ),
    ("update_issue", include_str!("../assets/update_issue.cjs")),
    (
        "update_pull_request",
        include_str!("../assets/update_pull_request.cjs"),
    ),
    (
        "create_discussion",
        include_str!("../assets/create_discussion.cjs"),
    ),
    ("add_labels", include_str!("../assets/add_labels.cjs")),
    ("add_reviewer", include_str!("../assets/add_reviewer.cjs")),
    (
        "minimize_comment",
        include_str!("../assets/minimize_comment.cjs"),
    ),
    (
        "dispatch_workflow",
        include_str!("../assets/dispatch_workflow.cjs"),
    ),
    (
        "push_to_orphaned_branch",
        include_str!("../assets/push_to_orphaned_branch.cjs"),
    ),
    (
        "create_agent_task",
        include_str!("../assets/create_agent_task.cjs"),
    ),
    ("update_project", include_str!("../assets/update_project.cjs")),
    (
        "list_project_items_with_urls",
        include_str!("../assets/list_project_items_with_urls.cjs"),
    ),
    ("link_sub_issue", include_str!("../assets/link_sub_issue.cjs")),
    ("missing_tool", include_str!("../assets/missing_tool.cjs")),
    ("noop", include_str!("../assets/noop.cjs")),
    (
        "threat_detection",
        include_str!("../assets/threat_detection.cjs"),
    ),
    (
        "create_code_scanning_alert",
        include_str!("../assets/create_code_scanning_alert.cjs"),
    ),
    (
        "push_to_pull_request_branch",
        include_str!("../assets/push_to_pull_request_branch.cjs"),
    ),
    (
        "create_pr_review_comment",
        include_str!("../assets/create_pr_review_comment.cjs"),
    ),
    (
        "mark_pr_ready_for_review",
        include_str!("../assets/mark_pr_ready_for_review.cjs"),
    ),
    (
        "close_pull_request",
        include_str!("../assets/close_pull_request.cjs"),
    ),
    ("collect_output", include_str!("../assets/collect_output.cjs")),
    (
        "substitute_placeholders",
        include_str!("../assets/substitute_placeholders.cjs"),
    ),
    ("update_reaction", include_str!("../assets/update_reaction.cjs")),
    ("conclusion", include_str!("../assets/conclusion.cjs")),
    ("parse_claude_log", include_str!("../assets/parse_claude_log.cjs")),
    (
        "parse_copilot_log",
        include_str!("../assets/parse_copilot_log.cjs"),
    ),
    ("parse_codex_log", include_str!("../assets/parse_codex_log.cjs")),
    (
        "parse_gemini_log",
        include_str!("../assets/parse_gemini_log.cjs"),
    ),
];

/// Look up an embedded script by name.
pub fn get_script(name: &str) -> Option<&'static str> {
    SCRIPTS
        .iter()
        .find(|(script_name, _)| *script_name == name)
        .map(|(_, source)| *source)
}

/// All registered script names.
pub fn script_names() -> Vec<&'static str> {
    SCRIPTS.iter().map(|(name, _)| *name).collect()
}
