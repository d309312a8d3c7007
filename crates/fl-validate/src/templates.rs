//! Template-region positioning: after import resolution, no `@include`
//! or `@import` directive may remain inside a `{{#if}}` region.

use fl_core::CompileError;

pub fn validate_template_regions(markdown: &str) -> Result<(), CompileError> {
    let mut depth = 0usize;
    for (idx, line) in markdown.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("{{#if") {
            depth += 1;
        } else if trimmed.starts_with("{{/if}}") {
            depth = depth.saturating_sub(1);
        } else if depth > 0
            && (trimmed.starts_with("@include") || trimmed.starts_with("@import"))
        {
            return Err(CompileError::IncludeInsideTemplate(idx + 1));
        }
    }
    Ok(())
}
