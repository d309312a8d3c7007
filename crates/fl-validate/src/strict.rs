//! Strict-mode constraints.

use serde_yaml::Value;

use fl_config::{NetworkPermissions, WorkflowSpec};
use fl_core::CompileError;

/// All strict-mode violations in `spec`.
pub fn validate_strict(spec: &WorkflowSpec) -> Vec<CompileError> {
    let mut errors = Vec::new();

    for key in &spec.unknown_keys {
        errors.push(CompileError::InvalidFrontMatterKey(key.clone()));
    }

    // Explicit network, and never the wildcard.
    if !spec.network_declared {
        errors.push(CompileError::StrictModeViolation(
            "network must be declared explicitly".to_string(),
        ));
    } else if spec.network.is_wildcard() {
        errors.push(CompileError::StrictModeViolation(
            "network must be an explicit allow-list, not \"*\"".to_string(),
        ));
    }

    // Every custom MCP server carries its own egress policy.
    for (name, server) in spec.all_mcp_servers() {
        if server.network.is_none() {
            errors.push(CompileError::StrictModeViolation(format!(
                "MCP server '{name}' must declare a network policy"
            )));
        } else if server
            .network
            .as_ref()
            .is_some_and(NetworkPermissions::is_wildcard)
        {
            errors.push(CompileError::StrictModeViolation(format!(
                "MCP server '{name}' must not use a wildcard network policy"
            )));
        }
    }

    // No write permissions in user-declared custom jobs.
    if let Some(so) = &spec.safe_outputs {
        for (job_name, job_value) in &so.custom_jobs {
            for permission in write_permissions(job_value) {
                errors.push(CompileError::CustomJobWritePermission {
                    job: job_name.clone(),
                    permission,
                });
            }
        }
    }

    errors
}

/// Write grants in a custom job's `permissions:` block: the `write-all`
/// shorthand or any scope mapped to `write`.
fn write_permissions(job: &Value) -> Vec<String> {
    let Some(permissions) = job.get("permissions") else {
        return Vec::new();
    };
    match permissions {
        Value::String(s) if s.ends_with("-all") && s.starts_with("write") => {
            vec![s.clone()]
        }
        Value::Mapping(map) => map
            .iter()
            .filter_map(|(k, v)| {
                let scope = k.as_str()?;
                (v.as_str()? == "write").then(|| format!("{scope}: write"))
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_config::parse_workflow;
    use fl_frontmatter::split_frontmatter;

    fn spec(frontmatter: &str) -> WorkflowSpec {
        let src = split_frontmatter(&format!("---\n{frontmatter}\n---\nbody")).unwrap();
        parse_workflow(&src, "wf").unwrap()
    }

    #[test]
    fn test_clean_spec_passes() {
        let errors = validate_strict(&spec(
            "on: push\nnetwork:\n  allowed: [api.github.com]",
        ));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_wildcard_network_rejected() {
        let errors = validate_strict(&spec("on: push\nnetwork: \"*\""));
        assert!(errors.iter().any(|e| matches!(e, CompileError::StrictModeViolation(_))));
    }

    #[test]
    fn test_undeclared_network_rejected() {
        let errors = validate_strict(&spec("on: push"));
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("network must be declared"))
        );
    }

    #[test]
    fn test_mcp_server_without_network_policy() {
        let errors = validate_strict(&spec(
            "on: push\ntools:\n  repomix:\n    command: npx",
        ));
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("MCP server 'repomix' must declare"))
        );

        let errors = validate_strict(&spec(
            "on: push\nnetwork:\n  allowed: [registry.npmjs.org]\ntools:\n  repomix:\n    command: npx\n    network:\n      allowed: [registry.npmjs.org]",
        ));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_custom_job_write_map_entry() {
        let errors = validate_strict(&spec(
            "on: push\nsafe-outputs:\n  jobs:\n    deploy:\n      permissions:\n        contents: write",
        ));
        let err = errors
            .iter()
            .find(|e| matches!(e, CompileError::CustomJobWritePermission { .. }))
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("Custom job"));
        assert!(msg.contains("write"));
    }

    #[test]
    fn test_custom_job_write_all_shorthand() {
        let errors = validate_strict(&spec(
            "on: push\nsafe-outputs:\n  jobs:\n    deploy:\n      permissions: write-all",
        ));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, CompileError::CustomJobWritePermission { .. }))
        );
    }

    #[test]
    fn test_custom_job_read_permissions_ok() {
        let errors = validate_strict(&spec(
            "on: push\nsafe-outputs:\n  jobs:\n    audit:\n      permissions:\n        contents: read",
        ));
        assert!(
            !errors
                .iter()
                .any(|e| matches!(e, CompileError::CustomJobWritePermission { .. }))
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let errors = validate_strict(&spec("on: push\nflavor: vanilla\nnetwork:\n  allowed: []"));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, CompileError::InvalidFrontMatterKey(k) if k == "flavor"))
        );
    }
}
