//! `@include` / `@import` resolution with cycle detection and
//! front-matter fragment merging.

use anyhow::{Context, Result, bail};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use fl_core::CompileError;

use crate::source::{WorkflowSource, split_frontmatter};
use crate::steps::{merge_steps, parse_steps_from_frontmatter};

/// Front-matter keys an imported file may contribute to the main file.
const MERGEABLE_KEYS: &[&str] = &[
    "tools",
    "mcp-servers",
    "safe-outputs",
    "engine",
    "network",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Include,
    OptionalInclude,
    Import,
}

/// Resolve all import directives in `src`, returning a source whose body
/// is fully expanded and whose front matter has absorbed imported
/// fragments (main-file values win on conflict).
pub fn resolve_imports(src: WorkflowSource, base_dir: &Path) -> Result<WorkflowSource> {
    let mut resolver = Resolver {
        visited: BTreeSet::new(),
        stack: Vec::new(),
        fragments: Vec::new(),
    };

    let mut markdown = resolver.expand_body(&src.markdown, base_dir)?;
    let mut frontmatter = src.frontmatter;

    // `imports:` front-matter entries behave like trailing @include lines.
    if let Some(Value::Sequence(entries)) = frontmatter.get("imports").cloned() {
        for entry in entries {
            let Some(spec) = entry.as_str() else {
                bail!("imports entries must be strings, got {:?}", entry);
            };
            let (path, section) = split_section(spec);
            let expanded =
                resolver.expand_file(&base_dir.join(path), section, Directive::Import)?;
            if !expanded.trim().is_empty() {
                markdown.push_str("\n\n");
                markdown.push_str(&expanded);
            }
        }
        frontmatter.remove("imports");
    }

    for fragment in resolver.fragments {
        merge_fragment(&mut frontmatter, fragment)?;
    }

    Ok(WorkflowSource {
        frontmatter,
        markdown,
    })
}

struct Resolver {
    visited: BTreeSet<PathBuf>,
    stack: Vec<PathBuf>,
    /// Front-matter fragments contributed by imported files, in import order.
    fragments: Vec<Mapping>,
}

impl Resolver {
    fn expand_body(&mut self, body: &str, dir: &Path) -> Result<String> {
        let mut out = String::new();
        let mut template_depth = 0usize;
        for (idx, line) in body.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("{{#if") {
                template_depth += 1;
            } else if trimmed.starts_with("{{/if}}") {
                template_depth = template_depth.saturating_sub(1);
            } else if let Some((directive, spec)) = parse_directive(trimmed) {
                if template_depth > 0 {
                    return Err(CompileError::IncludeInsideTemplate(idx + 1).into());
                }
                let (path, section) = split_section(spec);
                let expanded = self.expand_file(&dir.join(path), section, directive)?;
                out.push_str(&expanded);
                out.push('\n');
                continue;
            }
            out.push_str(line);
            out.push('\n');
        }
        // lines() drops the final newline; keep the body's shape.
        if !body.ends_with('\n') && out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }

    fn expand_file(
        &mut self,
        path: &Path,
        section: Option<&str>,
        directive: Directive,
    ) -> Result<String> {
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if directive == Directive::OptionalInclude {
                    debug!(path = %path.display(), "optional include not found, skipping");
                    return Ok(format!(
                        "<!-- optional include not found: {} -->",
                        path.display()
                    ));
                }
                bail!("included file not found: {}", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("cannot resolve '{}'", path.display()));
            }
        };

        if self.stack.contains(&canonical) {
            let mut chain: Vec<String> = self
                .stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(canonical.display().to_string());
            return Err(CompileError::ImportCycle(chain.join(" -> ")).into());
        }
        if self.visited.contains(&canonical) {
            // Diamond imports are fine; the content was already spliced once.
            return Ok(String::new());
        }

        let content = std::fs::read_to_string(&canonical)
            .with_context(|| format!("failed to read '{}'", canonical.display()))?;

        // Included files may carry their own front matter; its mergeable
        // keys flow back to the main file.
        let (fragment, body) = if content.starts_with("---") {
            let src = split_frontmatter(&content).map_err(|reason| {
                CompileError::MalformedFrontMatter {
                    path: canonical.display().to_string(),
                    reason,
                }
            })?;
            (Some(src.frontmatter), src.markdown)
        } else {
            (None, content)
        };

        let body = match section {
            Some(title) => extract_section(&body, title).ok_or_else(|| {
                anyhow::anyhow!(
                    "section '#{}' not found in '{}'",
                    title,
                    canonical.display()
                )
            })?,
            None => body,
        };

        self.stack.push(canonical.clone());
        let parent = canonical.parent().unwrap_or(Path::new(".")).to_path_buf();
        let expanded = self.expand_body(&body, &parent)?;
        self.stack.pop();
        self.visited.insert(canonical);
        if let Some(fragment) = fragment {
            self.fragments.push(fragment);
        }
        Ok(expanded)
    }
}

fn parse_directive(line: &str) -> Option<(Directive, &str)> {
    if let Some(rest) = line.strip_prefix("@include?") {
        return Some((Directive::OptionalInclude, rest.trim()));
    }
    if let Some(rest) = line.strip_prefix("@include ") {
        return Some((Directive::Include, rest.trim()));
    }
    if let Some(rest) = line.strip_prefix("@import ") {
        return Some((Directive::Import, rest.trim()));
    }
    None
}

fn split_section(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('#') {
        Some((path, section)) => (path.trim(), Some(section.trim())),
        None => (spec.trim(), None),
    }
}

/// Extract one Markdown section (heading plus content up to the next
/// heading of the same or higher level).
fn extract_section(body: &str, title: &str) -> Option<String> {
    let mut out: Vec<&str> = Vec::new();
    let mut level = 0usize;
    let mut capturing = false;
    for line in body.lines() {
        let hashes = line.chars().take_while(|&c| c == '#').count();
        let is_heading = hashes > 0 && line.chars().nth(hashes) == Some(' ');
        if capturing {
            if is_heading && hashes <= level {
                break;
            }
            out.push(line);
        } else if is_heading && line[hashes..].trim() == title {
            capturing = true;
            level = hashes;
            out.push(line);
        }
    }
    if capturing { Some(out.join("\n")) } else { None }
}

/// Merge one imported front-matter fragment into the main mapping.
///
/// Maps merge key-wise with main winning per key; scalars are taken only
/// when the main file omits them; step lists concatenate imported-first.
fn merge_fragment(main: &mut Mapping, fragment: Mapping) -> Result<()> {
    for key in MERGEABLE_KEYS {
        let k = Value::String(key.to_string());
        let Some(imported) = fragment.get(&k) else {
            continue;
        };
        match main.get_mut(&k) {
            None => {
                main.insert(k, imported.clone());
            }
            Some(Value::Mapping(existing)) => {
                if let Value::Mapping(imported_map) = imported {
                    for (ik, iv) in imported_map {
                        if !existing.contains_key(ik) {
                            existing.insert(ik.clone(), iv.clone());
                        }
                    }
                }
                // Non-mapping import under a mapping main key: main wins.
            }
            Some(_) => {}
        }
    }

    let steps_key = Value::String("steps".to_string());
    if let Some(imported_steps) = fragment.get(&steps_key) {
        let imported = parse_steps_from_frontmatter(imported_steps)?;
        let main_steps = match main.get(&steps_key) {
            Some(v) => parse_steps_from_frontmatter(v)?,
            None => Default::default(),
        };
        let merged = merge_steps(main_steps, imported);
        main.insert(steps_key, merged.to_value());
    }
    Ok(())
}

#[cfg(test)]
#[path = "imports_tests.rs"]
mod imports_tests;
