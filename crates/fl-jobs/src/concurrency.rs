//! Concurrency group derivation.

use fl_config::WorkflowSpec;
use fl_emit::{YamlBuilder, yaml_quote};

/// A concurrency policy rule: first match wins.
struct Rule {
    applies: fn(&WorkflowSpec) -> bool,
    group: fn(&WorkflowSpec) -> String,
    cancel_in_progress: bool,
}

const RULES: &[Rule] = &[
    Rule {
        applies: |spec| spec.has_command_trigger(),
        group: |_| {
            "gh-aw-${{ github.workflow }}-${{ github.event.issue.number || github.event.pull_request.number }}"
                .to_string()
        },
        cancel_in_progress: false,
    },
    Rule {
        applies: |spec| spec.has_pull_request_trigger(),
        group: |_| "gh-aw-${{ github.workflow }}-${{ github.ref }}".to_string(),
        cancel_in_progress: true,
    },
];

/// Derive the workflow-level `concurrency:` block.
///
/// A user override is emitted verbatim; otherwise the rule table
/// applies, falling back to the per-workflow group.
pub fn derive_concurrency(spec: &WorkflowSpec) -> String {
    if let Some(user) = &spec.concurrency {
        let mut b = YamlBuilder::new();
        b.line(0, &format!("concurrency: {user}"));
        return b.finish();
    }
    match RULES.iter().find(|rule| (rule.applies)(spec)) {
        Some(rule) => render((rule.group)(spec), rule.cancel_in_progress),
        None => render("gh-aw-${{ github.workflow }}".to_string(), false),
    }
}

fn render(group: String, cancel_in_progress: bool) -> String {
    let mut b = YamlBuilder::new();
    b.line(0, "concurrency:");
    b.line(2, &format!("group: {}", yaml_quote(&group)));
    if cancel_in_progress {
        b.line(2, "cancel-in-progress: true");
    }
    b.finish()
}
