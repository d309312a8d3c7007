//! Action-pin resolution over user-declared steps.

use anyhow::{Result, bail};
use serde_yaml::Value;
use tracing::{debug, warn};

use fl_config::WorkflowSpec;
use fl_pins::{PinResolver, extract_base_repo, get_action_pin, register_pin};

/// Rewrite every `uses:` in user-declared steps to a pinned reference.
///
/// Local actions (`./…`) and already-pinned references pass through.
/// On a registry miss, the online resolver (when available) fills the
/// pin; otherwise strict mode rejects the floating tag and permissive
/// mode emits it with a warning.
pub fn pin_user_steps(
    spec: &mut WorkflowSpec,
    resolver: Option<&PinResolver>,
    strict: bool,
) -> Result<()> {
    let mut steps: Vec<&mut Value> = Vec::new();
    steps.extend(spec.custom_steps.pre.iter_mut());
    steps.extend(spec.custom_steps.pre_agent.iter_mut());
    steps.extend(spec.custom_steps.post_agent.iter_mut());
    steps.extend(spec.custom_steps.post.iter_mut());
    steps.extend(spec.engine.steps.iter_mut());

    for step in steps {
        let Some(map) = step.as_mapping_mut() else {
            continue;
        };
        let key = Value::String("uses".to_string());
        let Some(Value::String(uses)) = map.get(&key).cloned() else {
            continue;
        };
        let pinned = pin_reference(&uses, resolver, strict)?;
        if pinned != uses {
            map.insert(key, Value::String(pinned));
        }
    }
    Ok(())
}

fn pin_reference(uses: &str, resolver: Option<&PinResolver>, strict: bool) -> Result<String> {
    if uses.starts_with("./") {
        return Ok(uses.to_string());
    }
    let Some((repo, version)) = uses.split_once('@') else {
        bail!("action reference '{uses}' has no @version");
    };
    if is_sha(version) {
        return Ok(uses.to_string());
    }

    let pinned = get_action_pin(extract_base_repo(repo), version);
    if let Some(sha) = pinned.split_once('@').map(|(_, v)| v).filter(|v| is_sha(v)) {
        return Ok(format!("{repo}@{sha}"));
    }

    if let Some(resolver) = resolver {
        let sha = resolver.resolve_sha(repo, version)?;
        register_pin(extract_base_repo(repo), version, &sha);
        debug!(%repo, %version, %sha, "resolved action pin");
        return Ok(format!("{repo}@{sha}"));
    }

    if strict {
        bail!("unpinned action '{uses}' is not allowed in strict mode");
    }
    warn!(%uses, "emitting unpinned action reference");
    Ok(uses.to_string())
}

fn is_sha(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}
