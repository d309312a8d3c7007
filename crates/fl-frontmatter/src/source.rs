use anyhow::{Context, Result};
use serde_yaml::Mapping;
use std::path::Path;

use fl_core::CompileError;

/// A workflow source file split into its two halves.
#[derive(Debug, Clone)]
pub struct WorkflowSource {
    /// Parsed front-matter mapping (raw, untyped).
    pub frontmatter: Mapping,
    /// Markdown body following the closing `---`.
    pub markdown: String,
}

/// Read a workflow `.md` file and split it into front matter and body.
pub fn load(path: &Path) -> Result<WorkflowSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    split_frontmatter(&content).map_err(|reason| {
        CompileError::MalformedFrontMatter {
            path: path.display().to_string(),
            reason,
        }
        .into()
    })
}

/// Split `---`-delimited front matter from the Markdown body.
///
/// The first line must be exactly `---`; the front matter runs to the
/// next `---` line and must parse as a YAML mapping.
pub fn split_frontmatter(content: &str) -> std::result::Result<WorkflowSource, String> {
    let mut lines = content.lines();
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return Err("file must start with a '---' front matter delimiter".to_string()),
    }

    let mut fm_lines: Vec<&str> = Vec::new();
    let mut closed = false;
    let mut body_start = 0usize;
    // Offsets: line 0 is the opening delimiter.
    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim_end() == "---" {
            closed = true;
            body_start = idx + 1;
            break;
        }
        fm_lines.push(line);
    }
    if !closed {
        return Err("missing closing '---' front matter delimiter".to_string());
    }

    let fm_text = fm_lines.join("\n");
    let value: serde_yaml::Value =
        serde_yaml::from_str(&fm_text).map_err(|e| format!("invalid YAML: {e}"))?;
    let frontmatter = match value {
        serde_yaml::Value::Mapping(m) => m,
        serde_yaml::Value::Null => Mapping::new(),
        other => {
            return Err(format!(
                "front matter must be a mapping, got {}",
                yaml_kind(&other)
            ));
        }
    };

    let markdown = content
        .lines()
        .skip(body_start)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(WorkflowSource {
        frontmatter,
        markdown,
    })
}

fn yaml_kind(v: &serde_yaml::Value) -> &'static str {
    match v {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let src = split_frontmatter("---\nname: demo\non: push\n---\n# Prompt\n\nDo things.")
            .unwrap();
        assert_eq!(
            src.frontmatter.get("name").and_then(|v| v.as_str()),
            Some("demo")
        );
        assert_eq!(src.markdown, "# Prompt\n\nDo things.");
    }

    #[test]
    fn test_missing_opening_delimiter() {
        let err = split_frontmatter("name: demo\n---\nbody").unwrap_err();
        assert!(err.contains("must start with"));
    }

    #[test]
    fn test_missing_closing_delimiter() {
        let err = split_frontmatter("---\nname: demo\nbody").unwrap_err();
        assert!(err.contains("missing closing"));
    }

    #[test]
    fn test_non_mapping_front_matter() {
        let err = split_frontmatter("---\n- a\n- b\n---\nbody").unwrap_err();
        assert!(err.contains("must be a mapping"));
        assert!(err.contains("sequence"));
    }

    #[test]
    fn test_empty_front_matter_is_empty_mapping() {
        let src = split_frontmatter("---\n---\nbody").unwrap();
        assert!(src.frontmatter.is_empty());
        assert_eq!(src.markdown, "body");
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.md");
        std::fs::write(&path, "no front matter").unwrap();
        let err = load(&path).unwrap_err();
        let compile_err = err.downcast_ref::<fl_core::CompileError>().unwrap();
        assert!(compile_err.to_string().contains("broken.md"));
    }

    #[test]
    fn test_body_preserves_inner_dashes() {
        let src = split_frontmatter("---\nname: x\n---\nabove\n---\nbelow").unwrap();
        assert_eq!(src.markdown, "above\n---\nbelow");
    }
}
