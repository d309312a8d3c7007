//! Console message formatting with unified severity prefixes.

/// Format an error message for terminal output.
pub fn format_error(msg: &str) -> String {
    format!("error: {msg}")
}

/// Format a warning message for terminal output.
pub fn format_warning(msg: &str) -> String {
    format!("warning: {msg}")
}

/// Format an informational message for terminal output.
pub fn format_info(msg: &str) -> String {
    format!("info: {msg}")
}

/// Join accumulated validation messages into one bulleted block.
pub fn bulleted(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!("  - {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}
