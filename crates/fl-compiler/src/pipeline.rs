//! `compile_workflow`: the end-to-end pipeline.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use fl_config::parse_workflow;
use fl_frontmatter::{load, resolve_imports};
use fl_jobs::{
    BuildContext, JobGraph, build_activation, build_agent, build_conclusion, build_detection,
    build_safe_output_jobs,
};
use fl_pins::PinResolver;
use fl_process::CommandRunner;
use fl_validate::{ValidateOptions, validate_workflow};

use crate::defaults::apply_default_tools;
use crate::emit::render_lock_file;
use crate::pins_pass::pin_user_steps;

/// Compiler tuning, typically set from CLI flags.
pub struct CompilerOptions<'a> {
    /// Strict validation profile (also switched on by front matter).
    pub strict: bool,
    /// Run the pipeline but skip the final write.
    pub no_emit: bool,
    /// Compare against the on-disk lock file instead of writing.
    pub check: bool,
    /// Skip subprocess probes and online pin resolution.
    pub offline: bool,
    /// Minify embedded JS payloads through terser when available.
    pub minify: bool,
    /// Subprocess runner for probes and minification.
    pub runner: &'a dyn CommandRunner,
    /// Extra text for the version stamp (git describe or ref).
    pub build_info: Option<String>,
}

impl<'a> CompilerOptions<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            strict: false,
            no_emit: false,
            check: false,
            offline: false,
            minify: false,
            runner,
            build_info: None,
        }
    }
}

/// A finished compilation.
#[derive(Debug)]
pub struct CompiledWorkflow {
    pub lock_path: PathBuf,
    pub content: String,
    /// True in check mode when the on-disk lock file is stale.
    pub drifted: bool,
}

/// Compile one workflow source file into its `.lock.yml`.
pub fn compile_workflow(path: &Path, options: &CompilerOptions) -> Result<CompiledWorkflow> {
    // 1. Load and resolve imports.
    let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let src = load(path)?;
    let src = resolve_imports(src, &base_dir)?;

    // 2. Parse into the typed model.
    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workflow");
    let mut spec = parse_workflow(&src, default_name)?;
    let strict = options.strict || spec.strict;
    debug!(workflow = %spec.name, strict, "parsed workflow");

    // 3. Default tools.
    apply_default_tools(&mut spec);

    // 4. Validators.
    validate_workflow(
        &spec,
        options.runner,
        ValidateOptions {
            strict: options.strict,
            skip_probes: options.offline,
        },
    )?;

    // 5. Pin resolution over user steps.
    let resolver = if options.offline {
        None
    } else {
        Some(PinResolver::new(
            options.runner,
            PinResolver::default_cache_path(),
        ))
    };
    pin_user_steps(&mut spec, resolver.as_ref(), strict)?;

    // 6. Job graph: activation -> agent -> (detection) -> sinks -> conclusion.
    let mut ctx = BuildContext::new(&spec);
    if options.minify && !options.offline {
        ctx.minify_runner = Some(options.runner);
    }
    let mut graph = JobGraph::new();
    graph.add(build_activation(&ctx)?)?;
    graph.add(build_agent(&ctx)?)?;
    if let Some(detection) = build_detection(&ctx)? {
        graph.add(detection)?;
    }
    let sink_jobs = build_safe_output_jobs(&ctx)?;
    let sink_names: Vec<String> = sink_jobs.iter().map(|j| j.name.clone()).collect();
    for job in sink_jobs {
        graph.add(job)?;
    }
    if let Some(conclusion) = build_conclusion(&ctx, &sink_names)? {
        graph.add(conclusion)?;
    }
    graph.validate()?;

    // 7. Render.
    let content = render_lock_file(&spec, &graph, &version_stamp(options))?;

    // 8. Size limits on the final document.
    fl_emit::enforce_line_limits(&content)?;

    // 9. Single atomic write.
    let lock_path = lock_path_for(path);
    if options.check {
        let on_disk = std::fs::read_to_string(&lock_path).unwrap_or_default();
        let drifted = on_disk != content;
        if drifted {
            info!(path = %lock_path.display(), "lock file is stale");
        }
        return Ok(CompiledWorkflow {
            lock_path,
            content,
            drifted,
        });
    }
    if !options.no_emit {
        write_atomically(&lock_path, &content)?;
        info!(path = %lock_path.display(), "wrote lock file");
    }
    Ok(CompiledWorkflow {
        lock_path,
        content,
        drifted: false,
    })
}

/// Compile every `*.md` file directly inside `dir`.
///
/// All files compile even when one fails; the first error is returned
/// at the end.
pub fn compile_directory(dir: &Path, options: &CompilerOptions) -> Result<Vec<CompiledWorkflow>> {
    let mut results = Vec::new();
    let mut first_error = None;
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read directory '{}'", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    entries.sort();
    if entries.is_empty() {
        bail!("no .md workflow files in '{}'", dir.display());
    }
    for path in entries {
        match compile_workflow(&path, options) {
            Ok(compiled) => results.push(compiled),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "compilation failed");
                if first_error.is_none() {
                    first_error = Some(e.context(format!("while compiling '{}'", path.display())));
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}

fn version_stamp(options: &CompilerOptions) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let build_info = options
        .build_info
        .clone()
        .or_else(|| std::env::var("GITHUB_REF").ok().filter(|r| !r.is_empty()));
    match build_info {
        Some(info) => format!("flowlock {version} ({info})"),
        None => format!("flowlock {version}"),
    }
}

fn lock_path_for(source: &Path) -> PathBuf {
    source.with_extension("lock.yml")
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("lock.yml.tmp");
    std::fs::write(&tmp, content)
        .with_context(|| format!("cannot write '{}'", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("cannot move lock file into place at '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod pipeline_tests;
