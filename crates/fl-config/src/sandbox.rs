//! Agent sandbox configuration (`sandbox:` front matter).

use anyhow::{Result, bail};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Environment and mounts a containerized agent needs for one runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainMapping {
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<String>,
}

/// Sandbox settings for the agent job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxConfig {
    pub enabled: bool,
    /// Opt out of the forced `contents: read` on the agent job.
    pub escape: bool,
    /// Runtime name -> env/mounts forwarded into the sandbox container.
    pub toolchains: BTreeMap<String, ToolchainMapping>,
}

/// Parse the `sandbox:` value: a bool or a mapping
/// `{enabled, escape, toolchains}`.
pub fn parse_sandbox(value: &Value) -> Result<SandboxConfig> {
    match value {
        Value::Bool(enabled) => Ok(SandboxConfig {
            enabled: *enabled,
            ..Default::default()
        }),
        Value::Null => Ok(SandboxConfig {
            enabled: true,
            ..Default::default()
        }),
        Value::Mapping(map) => {
            let mut config = SandboxConfig {
                enabled: map.get("enabled").and_then(|v| v.as_bool()).unwrap_or(true),
                escape: map.get("escape").and_then(|v| v.as_bool()).unwrap_or(false),
                toolchains: BTreeMap::new(),
            };
            if let Some(Value::Mapping(toolchains)) = map.get("toolchains") {
                for (k, v) in toolchains {
                    let Some(runtime) = k.as_str() else {
                        bail!("sandbox.toolchains keys must be strings, got {:?}", k);
                    };
                    config
                        .toolchains
                        .insert(runtime.to_string(), parse_toolchain(runtime, v)?);
                }
            }
            Ok(config)
        }
        other => bail!("sandbox must be a bool or a mapping, got {:?}", other),
    }
}

fn parse_toolchain(runtime: &str, value: &Value) -> Result<ToolchainMapping> {
    let Some(map) = value.as_mapping() else {
        bail!("sandbox.toolchains.{runtime} must be a mapping");
    };
    let mut mapping = ToolchainMapping::default();
    if let Some(Value::Mapping(env)) = map.get("env") {
        for (k, v) in env {
            if let (Some(key), Some(val)) = (k.as_str(), v.as_str()) {
                mapping.env.insert(key.to_string(), val.to_string());
            }
        }
    }
    if let Some(Value::Sequence(mounts)) = map.get("mounts") {
        mapping.mounts = mounts
            .iter()
            .filter_map(|m| m.as_str().map(String::from))
            .collect();
    }
    Ok(mapping)
}
