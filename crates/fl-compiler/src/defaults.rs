//! Default-tool merging applied after parsing, before validation.

use fl_config::WorkflowSpec;

/// Git commands the agent needs when a branch-pushing sink is on.
const GIT_COMMANDS: &[&str] = &[
    "git add",
    "git branch",
    "git checkout",
    "git commit",
    "git diff",
    "git push",
    "git status",
];

/// Read-only shell basics every agent gets.
const BASE_COMMANDS: &[&str] = &["cat", "grep", "ls"];

/// Merge engine-implied and sink-implied tools into the user's config.
pub fn apply_default_tools(spec: &mut WorkflowSpec) {
    if spec.tools.bash.is_some() {
        spec.tools.add_bash_commands(BASE_COMMANDS);
    }
    if spec
        .safe_outputs
        .as_ref()
        .is_some_and(|so| so.needs_git_commands())
    {
        spec.tools.add_bash_commands(GIT_COMMANDS);
    }
}
