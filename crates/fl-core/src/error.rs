#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("Malformed front matter in '{path}': {reason}")]
    MalformedFrontMatter { path: String, reason: String },

    #[error("Import cycle detected: {0}")]
    ImportCycle(String),

    #[error("Unknown front matter key '{0}'")]
    InvalidFrontMatterKey(String),

    #[error("Invalid configuration for safe output '{sink}': {reason}")]
    InvalidSafeOutputConfig { sink: String, reason: String },

    #[error("Unauthorized expression(s): {found}. Allowed: {allowed}")]
    UnauthorizedExpression { found: String, allowed: String },

    #[error("Strict mode violation: {0}")]
    StrictModeViolation(String),

    #[error("Repository feature missing: {0}")]
    RepositoryFeatureMissing(String),

    #[error("Container image unavailable: '{image}' for MCP server '{server}'")]
    ContainerImageUnavailable { image: String, server: String },

    #[error("Package '{package}' not found in {registry} registry")]
    RuntimePackageMissing { package: String, registry: String },

    #[error("@include/@import directives are not allowed inside {{{{#if}}}} template regions (line {0})")]
    IncludeInsideTemplate(usize),

    #[error("Custom job '{job}' requests write permission '{permission}'")]
    CustomJobWritePermission { job: String, permission: String },

    #[error("target-repo cannot be '*' (sink '{0}')")]
    WildcardTargetRepo(String),

    #[error("Cannot resolve action '{repo}@{version}' to a commit SHA: {reason}")]
    UnresolvableAction {
        repo: String,
        version: String,
        reason: String,
    },

    #[error("Action pin cache is corrupt: {0}")]
    ActionPinCacheCorrupt(String),

    #[error("Unknown engine '{id}'. Known engines: {known}")]
    UnknownEngine { id: String, known: String },

    #[error("Safe output '{0}' requires configuration under safe-outputs")]
    ConfigurationRequired(String),

    #[error("Conflicting settings for safe output '{sink}': {reason}")]
    ConflictingSinkSettings { sink: String, reason: String },

    #[error("MCP server '{0}' has ambiguous transport: both 'command' and 'url' set without 'type'")]
    MCPTransportAmbiguous(String),

    #[error("Expression size exceeded for '{key}': {size} characters (limit {limit})")]
    ExpressionSizeExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Line {line} is {size} characters long (limit {limit})")]
    LineTooLong {
        line: usize,
        size: usize,
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_malformed_front_matter() {
        let err = CompileError::MalformedFrontMatter {
            path: "wf.md".into(),
            reason: "missing closing delimiter".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed front matter in 'wf.md': missing closing delimiter"
        );
    }

    #[test]
    fn test_display_import_cycle() {
        let err = CompileError::ImportCycle("a.md -> b.md -> a.md".into());
        assert_eq!(err.to_string(), "Import cycle detected: a.md -> b.md -> a.md");
    }

    #[test]
    fn test_display_wildcard_target_repo() {
        let err = CompileError::WildcardTargetRepo("create-issue".into());
        assert_eq!(err.to_string(), "target-repo cannot be '*' (sink 'create-issue')");
    }

    #[test]
    fn test_display_include_inside_template() {
        let err = CompileError::IncludeInsideTemplate(12);
        assert_eq!(
            err.to_string(),
            "@include/@import directives are not allowed inside {{#if}} template regions (line 12)"
        );
    }

    #[test]
    fn test_display_unresolvable_action() {
        let err = CompileError::UnresolvableAction {
            repo: "actions/checkout".into(),
            version: "v5".into(),
            reason: "gh api returned empty output".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve action 'actions/checkout@v5' to a commit SHA: gh api returned empty output"
        );
    }

    #[test]
    fn test_display_unknown_engine() {
        let err = CompileError::UnknownEngine {
            id: "gpt".into(),
            known: "claude, codex, copilot, custom, gemini".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown engine 'gpt'. Known engines: claude, codex, copilot, custom, gemini"
        );
    }

    #[test]
    fn test_display_expression_size_exceeded() {
        let err = CompileError::ExpressionSizeExceeded {
            key: "jobs.agent.steps[3].run".into(),
            size: 21001,
            limit: 21000,
        };
        assert_eq!(
            err.to_string(),
            "Expression size exceeded for 'jobs.agent.steps[3].run': 21001 characters (limit 21000)"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompileError>();
    }
}
