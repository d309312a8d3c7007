//! Platform line-size limits.

use fl_core::CompileError;

/// Hard per-line bound on the emitted lock file (the platform's
/// expression size limit).
pub const EMIT_LINE_LIMIT: usize = 21_000;

/// Pre-check bound applied to user-supplied payloads before emission
/// overhead is added.
pub const PRECHECK_LINE_LIMIT: usize = 20_000;

/// Scan the final YAML; any line over [`EMIT_LINE_LIMIT`] aborts,
/// naming the nearest enclosing key.
pub fn enforce_line_limits(yaml: &str) -> Result<(), CompileError> {
    let mut current_key = String::from("(document root)");
    for line in yaml.lines() {
        if let Some(key) = leading_key(line) {
            current_key = key;
        }
        if line.len() > EMIT_LINE_LIMIT {
            return Err(CompileError::ExpressionSizeExceeded {
                key: current_key,
                size: line.len(),
                limit: EMIT_LINE_LIMIT,
            });
        }
    }
    Ok(())
}

/// Pre-check a user-supplied payload against [`PRECHECK_LINE_LIMIT`].
pub fn check_payload_lines(payload: &str) -> Result<(), CompileError> {
    for (idx, line) in payload.lines().enumerate() {
        if line.len() > PRECHECK_LINE_LIMIT {
            return Err(CompileError::LineTooLong {
                line: idx + 1,
                size: line.len(),
                limit: PRECHECK_LINE_LIMIT,
            });
        }
    }
    Ok(())
}

/// `  issues: write` -> `issues`; content lines return `None`.
fn leading_key(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let colon = trimmed.find(':')?;
    let candidate = &trimmed[..colon];
    if !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Some(candidate.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limits_passes() {
        assert!(enforce_line_limits("jobs:\n  agent:\n    runs-on: ubuntu-latest").is_ok());
    }

    #[test]
    fn test_over_limit_names_key() {
        let yaml = format!("jobs:\n  env_dump: {}\n", "x".repeat(EMIT_LINE_LIMIT + 1));
        let err = enforce_line_limits(&yaml).unwrap_err();
        match err {
            CompileError::ExpressionSizeExceeded { key, size, limit } => {
                assert_eq!(key, "env_dump");
                assert!(size > limit);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_precheck_boundary() {
        // Exactly at the bound is accepted; one past is rejected.
        let at_limit = "y".repeat(PRECHECK_LINE_LIMIT);
        assert!(check_payload_lines(&at_limit).is_ok());

        let over = "y".repeat(PRECHECK_LINE_LIMIT + 1);
        let err = check_payload_lines(&over).unwrap_err();
        assert!(matches!(
            err,
            CompileError::LineTooLong { line: 1, size, .. } if size == PRECHECK_LINE_LIMIT + 1
        ));
    }

    #[test]
    fn test_precheck_reports_line_number() {
        let payload = format!("short\n{}", "z".repeat(PRECHECK_LINE_LIMIT + 5));
        let err = check_payload_lines(&payload).unwrap_err();
        assert!(matches!(err, CompileError::LineTooLong { line: 2, .. }));
    }
}
