//! Shell heredoc embedding for YAML run-steps.

use crate::yaml::YamlBuilder;

/// Append a `cat >> $FILE << 'EOF'` heredoc to a run-step body.
///
/// `indent` is the indentation of the run-step's content lines; the
/// heredoc body keeps its own internal indentation verbatim (quoting the
/// delimiter suppresses shell expansion).
pub fn append_heredoc(builder: &mut YamlBuilder, indent: usize, file_var: &str, content: &str) {
    builder.line(indent, &format!("cat >> {file_var} << 'EOF'"));
    for line in content.lines() {
        if line.is_empty() {
            builder.blank();
        } else {
            builder.line(indent, line);
        }
    }
    builder.line(indent, "EOF");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heredoc_shape() {
        let mut b = YamlBuilder::new();
        append_heredoc(&mut b, 10, "$GITHUB_AW_PROMPT", "# Task\n\nDo the thing.");
        let out = b.finish();
        assert_eq!(
            out,
            "          cat >> $GITHUB_AW_PROMPT << 'EOF'\n          # Task\n\n          Do the thing.\n          EOF\n"
        );
    }

    #[test]
    fn test_heredoc_delimiter_is_quoted() {
        let mut b = YamlBuilder::new();
        append_heredoc(&mut b, 0, "$F", "${{ not expanded }}");
        assert!(b.as_str().contains("<< 'EOF'"));
    }
}
