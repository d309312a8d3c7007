//! Runtime package availability probes.
//!
//! Detects `npm install` / `pip install` / `uv pip install` lines in
//! user-declared run steps and asks the corresponding registry whether
//! each named package exists. npm misses are hard errors; pip/uv misses
//! are warnings (the package may be installed at runtime from another
//! index).

use serde_yaml::Value;
use tracing::debug;

use fl_config::WorkflowSpec;
use fl_core::CompileError;
use fl_process::{CommandRunner, npm_package_exists, pip_package_exists, uv_package_exists};

#[derive(Debug, Default)]
pub struct PackageReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Runtime {
    Npm,
    Pip,
    Uv,
}

pub fn validate_packages(spec: &WorkflowSpec, runner: &dyn CommandRunner) -> PackageReport {
    let mut report = PackageReport::default();
    for (runtime, package) in collect_package_specs(spec) {
        let exists = match runtime {
            Runtime::Npm => npm_package_exists(runner, &package),
            Runtime::Pip => pip_package_exists(runner, &package),
            Runtime::Uv => uv_package_exists(runner, &package),
        };
        match (runtime, exists) {
            (_, Ok(true)) => {}
            (Runtime::Npm, Ok(false)) => report.errors.push(
                CompileError::RuntimePackageMissing {
                    package,
                    registry: "npm".to_string(),
                }
                .to_string(),
            ),
            (Runtime::Pip, Ok(false)) => report
                .warnings
                .push(format!("pip package '{package}' not found in the index")),
            (Runtime::Uv, Ok(false)) => report
                .warnings
                .push(format!("uv package '{package}' not found")),
            (_, Err(e)) => {
                // A missing or timing-out package manager is a soft failure.
                debug!(%package, error = %e, "package probe unavailable");
                report
                    .warnings
                    .push(format!("could not verify package '{package}': {e}"));
            }
        }
    }
    report
}

/// `(runtime, package)` pairs named by install commands in run steps.
fn collect_package_specs(spec: &WorkflowSpec) -> Vec<(Runtime, String)> {
    let mut specs = Vec::new();
    let steps = spec
        .custom_steps
        .pre
        .iter()
        .chain(&spec.custom_steps.pre_agent)
        .chain(&spec.custom_steps.post_agent)
        .chain(&spec.custom_steps.post)
        .chain(&spec.engine.steps);
    for step in steps {
        let Some(run) = step.get("run").and_then(Value::as_str) else {
            continue;
        };
        for line in run.lines() {
            specs.extend(parse_install_line(line));
        }
    }
    specs
}

fn parse_install_line(line: &str) -> Vec<(Runtime, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let runtime = if tokens.starts_with(&["npm", "install"]) || tokens.starts_with(&["npm", "i"]) {
        Runtime::Npm
    } else if tokens.starts_with(&["pip", "install"]) || tokens.starts_with(&["pip3", "install"]) {
        Runtime::Pip
    } else if tokens.starts_with(&["uv", "pip", "install"]) {
        Runtime::Uv
    } else {
        return Vec::new();
    };
    let skip = if runtime == Runtime::Uv { 3 } else { 2 };
    tokens
        .iter()
        .skip(skip)
        .filter(|t| !t.starts_with('-'))
        .map(|t| strip_version_spec(t, runtime).to_string())
        .filter(|t| !t.is_empty())
        .map(|package| (runtime, package))
        .collect()
}

/// `left-pad@1.3.0` -> `left-pad`; `requests==2.31` -> `requests`.
fn strip_version_spec(token: &str, runtime: Runtime) -> &str {
    match runtime {
        Runtime::Npm => {
            // Scoped packages keep their leading @.
            match token.char_indices().skip(1).find(|(_, c)| *c == '@') {
                Some((idx, _)) => &token[..idx],
                None => token,
            }
        }
        Runtime::Pip | Runtime::Uv => token
            .split(['=', '<', '>', '~', '!'])
            .next()
            .unwrap_or(token),
    }
}
