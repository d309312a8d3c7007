//! Rendering of step values into final-coordinate step blocks.
//!
//! A step block is the YAML text of one list item under
//! `jobs.<name>.steps`, rendered at its final indentation: the `- `
//! marker at column 6, keys at column 8.

use anyhow::{Context, Result};
use serde_yaml::Value;

/// Indentation of the `- ` list marker for job steps.
pub const STEP_INDENT: usize = 6;

/// Render a user-supplied step mapping into a final-coordinate block.
pub fn render_step_value(step: &Value) -> Result<String> {
    let text = serde_yaml::to_string(step).context("cannot render step as YAML")?;
    let mut out = String::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            out.push('\n');
            continue;
        }
        if idx == 0 {
            out.push_str("      - ");
        } else {
            out.push_str("        ");
        }
        out.push_str(line);
        out.push('\n');
    }
    Ok(out.trim_end().to_string())
}
