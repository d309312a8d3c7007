//! Engine selection parsed from the `engine:` front-matter key.

use anyhow::{Result, bail};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use fl_core::{CompileError, EngineId};

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub id: EngineId,
    /// The id string as written (keeps experimental suffixes).
    pub raw_id: String,
    pub version: Option<String>,
    pub model: Option<String>,
    /// Optional agent file whose content is prepended to the prompt.
    pub agent: Option<String>,
    pub env: BTreeMap<String, String>,
    /// Custom run steps; required for `custom`, ignored otherwise.
    pub steps: Vec<Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let id = fl_core::default_engine_id();
        Self {
            id,
            raw_id: id.as_str().to_string(),
            version: None,
            model: None,
            agent: None,
            env: BTreeMap::new(),
            steps: Vec::new(),
        }
    }
}

/// Parse the `engine:` value: a bare id string or a mapping
/// `{id, version, model, agent, env, steps}`.
pub fn parse_engine(value: &Value) -> Result<EngineConfig> {
    match value {
        Value::String(id) => Ok(EngineConfig {
            id: parse_engine_id(id)?,
            raw_id: id.clone(),
            ..Default::default()
        }),
        Value::Mapping(map) => {
            let raw_id = map
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("claude")
                .to_string();
            let mut env = BTreeMap::new();
            if let Some(Value::Mapping(env_map)) = map.get("env") {
                for (k, v) in env_map {
                    let (Some(key), Some(val)) = (k.as_str(), v.as_str()) else {
                        bail!("engine.env entries must be string: string");
                    };
                    env.insert(key.to_string(), val.to_string());
                }
            }
            let steps = match map.get("steps") {
                Some(Value::Sequence(seq)) => seq.clone(),
                Some(other) => bail!("engine.steps must be a sequence, got {:?}", other),
                None => Vec::new(),
            };
            let config = EngineConfig {
                id: parse_engine_id(&raw_id)?,
                raw_id,
                version: map.get("version").and_then(|v| v.as_str()).map(Into::into),
                model: map.get("model").and_then(|v| v.as_str()).map(Into::into),
                agent: map.get("agent").and_then(|v| v.as_str()).map(Into::into),
                env,
                steps,
            };
            if config.id == EngineId::Custom && config.steps.is_empty() {
                bail!("engine 'custom' requires at least one entry under engine.steps");
            }
            Ok(config)
        }
        other => bail!("engine must be a string or a mapping, got {:?}", other),
    }
}

fn parse_engine_id(id: &str) -> Result<EngineId> {
    EngineId::from_str(id).map_err(|_| {
        CompileError::UnknownEngine {
            id: id.to_string(),
            known: EngineId::all()
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_bare_string() {
        let config = parse_engine(&yaml("copilot")).unwrap();
        assert_eq!(config.id, EngineId::Copilot);
        assert_eq!(config.raw_id, "copilot");
        assert!(config.model.is_none());
    }

    #[test]
    fn test_mapping_form() {
        let config = parse_engine(&yaml(
            "id: claude\nversion: \"2.0.14\"\nmodel: claude-sonnet-4-5\nenv:\n  DEBUG: \"1\"",
        ))
        .unwrap();
        assert_eq!(config.id, EngineId::Claude);
        assert_eq!(config.version.as_deref(), Some("2.0.14"));
        assert_eq!(config.model.as_deref(), Some("claude-sonnet-4-5"));
        assert_eq!(config.env.get("DEBUG").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_experimental_suffix_keeps_raw_id() {
        let config = parse_engine(&yaml("codex-experimental")).unwrap();
        assert_eq!(config.id, EngineId::Codex);
        assert_eq!(config.raw_id, "codex-experimental");
    }

    #[test]
    fn test_unknown_engine_lists_known() {
        let err = parse_engine(&yaml("gpt")).unwrap_err();
        let compile_err = err.downcast_ref::<CompileError>().unwrap();
        assert!(compile_err.to_string().contains("claude"));
        assert!(compile_err.to_string().contains("gemini"));
    }

    #[test]
    fn test_custom_requires_steps() {
        let err = parse_engine(&yaml("id: custom")).unwrap_err();
        assert!(err.to_string().contains("engine.steps"));
        let ok = parse_engine(&yaml("id: custom\nsteps:\n  - run: ./agent.sh")).unwrap();
        assert_eq!(ok.steps.len(), 1);
    }

    #[test]
    fn test_default_is_claude() {
        let config = EngineConfig::default();
        assert_eq!(config.id, EngineId::Claude);
        assert_eq!(config.raw_id, "claude");
    }

    #[test]
    fn test_registered_id_resolves() {
        fl_core::register_engine("house-blend", EngineId::Custom);
        let config =
            parse_engine(&yaml("id: house-blend\nsteps:\n  - run: ./agent.sh")).unwrap();
        assert_eq!(config.id, EngineId::Custom);
        assert_eq!(config.raw_id, "house-blend");
    }
}
