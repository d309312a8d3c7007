//! Expression safety: every `${{ … }}` in the prompt body must come
//! from the static allow-list or one of the sanctioned prefix classes.

use anyhow::Result;

use fl_core::CompileError;

/// Context accesses that are always safe to reference.
pub const ALLOWED_EXPRESSIONS: &[&str] = &[
    "github.actor",
    "github.api_url",
    "github.event_name",
    "github.job",
    "github.ref",
    "github.repository",
    "github.repository_owner",
    "github.run_id",
    "github.server_url",
    "github.sha",
    "github.workflow",
    "github.workspace",
];

/// Prefix classes whose members are safe.
pub const ALLOWED_PREFIXES: &[&str] = &["needs.", "steps.", "github.event.inputs.", "env."];

/// Scan the body and reject unauthorized expressions.
pub fn validate_expressions(markdown: &str) -> Result<(), CompileError> {
    let mut unauthorized: Vec<String> = Vec::new();
    let mut rest = markdown;
    while let Some(start) = rest.find("${{") {
        let after = &rest[start + 3..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let inner = &after[..end];
        if inner.contains('\n') {
            unauthorized.push(format!("{} (multi-line)", inner.trim().replace('\n', " ")));
        } else {
            for leaf in unauthorized_leaves(inner) {
                if !unauthorized.contains(&leaf) {
                    unauthorized.push(leaf);
                }
            }
        }
        rest = &after[end + 2..];
    }
    if unauthorized.is_empty() {
        return Ok(());
    }
    Err(CompileError::UnauthorizedExpression {
        found: unauthorized.join(", "),
        allowed: ALLOWED_EXPRESSIONS.join(", "),
    })
}

/// Property accesses in `expr` that the allow-list does not cover.
///
/// The expression is split into comparison clauses; literals pass, and
/// every property-access operand must be allowed.
fn unauthorized_leaves(expr: &str) -> Vec<String> {
    let mut bad = Vec::new();
    for clause in split_on(expr, &["&&", "||"]) {
        for operand in split_on(&clause, &["==", "!=", "<=", ">=", "<", ">"]) {
            let token = operand.trim();
            if token.is_empty() || is_literal(token) {
                continue;
            }
            if is_property_access(token) {
                if !is_allowed(token) {
                    bad.push(token.to_string());
                }
            } else {
                // Function calls, indexing, arithmetic: not sanctioned.
                bad.push(token.to_string());
            }
        }
    }
    bad
}

fn split_on(expr: &str, ops: &[&str]) -> Vec<String> {
    let mut parts = vec![expr.to_string()];
    for op in ops {
        parts = parts
            .iter()
            .flat_map(|p| p.split(op).map(String::from).collect::<Vec<_>>())
            .collect();
    }
    parts
}

fn is_literal(token: &str) -> bool {
    token.starts_with('\'')
        || token.starts_with('"')
        || token.parse::<f64>().is_ok()
        || matches!(token, "true" | "false" | "null")
}

fn is_property_access(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

fn is_allowed(token: &str) -> bool {
    ALLOWED_EXPRESSIONS.contains(&token)
        || ALLOWED_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
}
