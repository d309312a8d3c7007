//! Workflow validation: a fixed-order chain of pure checks whose
//! failures accumulate into one bulleted report.

pub mod containers;
pub mod expressions;
pub mod features;
pub mod packages;
pub mod strict;
pub mod templates;

use anyhow::{Result, bail};
use tracing::warn;

use fl_config::WorkflowSpec;
use fl_process::CommandRunner;

/// Validation tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Strict profile: unknown keys, custom-job writes, wildcard
    /// network, and policy-less MCP servers become errors; feature
    /// probe warnings harden into errors.
    pub strict: bool,
    /// Skip subprocess-backed probes (gh/docker/npm/pip/uv).
    pub skip_probes: bool,
}

/// Run every validator in declared order, accumulating failures.
pub fn validate_workflow(
    spec: &WorkflowSpec,
    runner: &dyn CommandRunner,
    options: ValidateOptions,
) -> Result<()> {
    let strict = options.strict || spec.strict;
    let mut errors: Vec<String> = Vec::new();

    // 1. Expression safety.
    if let Err(e) = expressions::validate_expressions(&spec.markdown) {
        errors.push(e.to_string());
    }

    // 2. Strict-mode constraints.
    if strict {
        errors.extend(strict::validate_strict(spec).into_iter().map(|e| e.to_string()));
    } else {
        for key in &spec.unknown_keys {
            warn!(key = %key, "ignoring unrecognized front matter key");
        }
    }

    // 3. Repository features (soft unless strict).
    if !options.skip_probes {
        for finding in features::validate_repository_features(spec, runner) {
            if strict {
                errors.push(finding);
            } else {
                warn!("{finding}");
            }
        }
    }

    // 4. Runtime package availability (npm hard, pip/uv soft).
    if !options.skip_probes {
        let report = packages::validate_packages(spec, runner);
        errors.extend(report.errors);
        for warning in report.warnings {
            warn!("{warning}");
        }
    }

    // 5. Container image existence (hard).
    if !options.skip_probes {
        for err in containers::validate_container_images(spec, runner) {
            errors.push(err.to_string());
        }
    }

    // 6. Custom-job permissions (strict reinforcement) is covered by 2.

    // 7. Template/include positioning.
    if let Err(e) = templates::validate_template_regions(&spec.markdown) {
        errors.push(e.to_string());
    }

    // 8. User payload line-length pre-check.
    if let Err(e) = validate_user_payload_lines(spec) {
        errors.push(e.to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }
    bail!(
        "workflow validation failed:\n{}",
        fl_core::bulleted(&errors)
    )
}

fn validate_user_payload_lines(spec: &WorkflowSpec) -> Result<()> {
    let all_steps = spec
        .custom_steps
        .pre
        .iter()
        .chain(&spec.custom_steps.pre_agent)
        .chain(&spec.custom_steps.post_agent)
        .chain(&spec.custom_steps.post)
        .chain(&spec.engine.steps);
    for step in all_steps {
        if let Some(run) = step.get("run").and_then(|v| v.as_str()) {
            fl_emit::check_payload_lines(run)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod lib_tests;
