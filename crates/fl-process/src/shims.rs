//! Thin wrappers over the external binaries the compiler consults.
//!
//! Each wrapper returns `Ok(..)` with a domain-shaped answer when the
//! probe ran, and `Err` only when the binary is missing or the call
//! failed in a way the caller must classify. Timeouts are surfaced as
//! probe failures, not panics.

use anyhow::{Result, bail};
use std::time::Duration;
use tracing::debug;

use crate::runner::CommandRunner;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// `gh api /repos/{owner}/{repo}/git/ref/tags/{tag} --jq .object.sha`.
///
/// Returns the 40-hex commit SHA for an action version tag.
pub fn gh_resolve_tag_sha(runner: &dyn CommandRunner, repo: &str, tag: &str) -> Result<String> {
    let path = format!("/repos/{repo}/git/ref/tags/{tag}");
    let out = runner.run(
        "gh",
        &["api", &path, "--jq", ".object.sha"],
        None,
        RESOLVE_TIMEOUT,
    )?;
    if out.timed_out {
        bail!("gh api timed out resolving {repo}@{tag}");
    }
    if !out.success() {
        bail!("gh api failed for {repo}@{tag}: {}", out.stderr.trim());
    }
    let sha = out.stdout.trim().to_string();
    if sha.len() != 40 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("gh api returned a non-SHA answer for {repo}@{tag}: '{sha}'");
    }
    Ok(sha.to_ascii_lowercase())
}

/// `gh api /repos/{owner}/{repo}` returning the raw JSON body.
///
/// Used by the repository feature probe (`has_issues`, `has_discussions`).
pub fn gh_api_json(runner: &dyn CommandRunner, repo_slug: &str) -> Result<String> {
    let path = format!("/repos/{repo_slug}");
    let out = runner.run("gh", &["api", &path], None, PROBE_TIMEOUT)?;
    if !out.success() {
        bail!("gh api /repos/{repo_slug} failed: {}", out.stderr.trim());
    }
    Ok(out.stdout)
}

/// `docker image inspect <image>` existence probe.
pub fn docker_image_exists(runner: &dyn CommandRunner, image: &str) -> Result<bool> {
    if !runner.available("docker") {
        bail!("docker is not installed");
    }
    let out = runner.run("docker", &["image", "inspect", image], None, PROBE_TIMEOUT)?;
    if out.timed_out {
        bail!("docker image inspect timed out for '{image}'");
    }
    Ok(out.success())
}

/// `npm view <pkg> name` existence probe.
pub fn npm_package_exists(runner: &dyn CommandRunner, package: &str) -> Result<bool> {
    if !runner.available("npm") {
        bail!("npm is not installed");
    }
    let out = runner.run("npm", &["view", package, "name"], None, PROBE_TIMEOUT)?;
    if out.timed_out {
        bail!("npm view timed out for '{package}'");
    }
    Ok(out.success())
}

/// `pip index versions <pkg>` (falling back to `pip3`) existence probe.
pub fn pip_package_exists(runner: &dyn CommandRunner, package: &str) -> Result<bool> {
    let pip = if runner.available("pip") {
        "pip"
    } else if runner.available("pip3") {
        "pip3"
    } else {
        bail!("neither pip nor pip3 is installed");
    };
    let out = runner.run(pip, &["index", "versions", package], None, PROBE_TIMEOUT)?;
    if out.timed_out {
        bail!("{pip} index versions timed out for '{package}'");
    }
    Ok(out.success())
}

/// `uv pip show <pkg>` existence probe.
pub fn uv_package_exists(runner: &dyn CommandRunner, package: &str) -> Result<bool> {
    if !runner.available("uv") {
        bail!("uv is not installed");
    }
    let out = runner.run("uv", &["pip", "show", package], None, PROBE_TIMEOUT)?;
    if out.timed_out {
        bail!("uv pip show timed out for '{package}'");
    }
    Ok(out.success())
}

/// `npx terser --module --compress --mangle` over stdin.
///
/// Returns `None` when terser is unavailable or fails; callers fall back
/// to the unminified source.
pub fn terser_minify(runner: &dyn CommandRunner, source: &str) -> Option<String> {
    if !runner.available("npx") {
        debug!("npx not available, skipping minification");
        return None;
    }
    let out = runner
        .run(
            "npx",
            &["terser", "--module", "--compress", "--mangle"],
            Some(source),
            PROBE_TIMEOUT,
        )
        .ok()?;
    if !out.success() || out.stdout.trim().is_empty() {
        debug!(stderr = %out.stderr.trim(), "terser failed, using unminified source");
        return None;
    }
    Some(out.stdout)
}
