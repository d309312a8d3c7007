//! Custom step lists positioned around the agent job.

use anyhow::{Result, bail};
use serde_yaml::Value;

/// User-declared steps split by position relative to the agent step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowSteps {
    /// Before checkout and engine installation.
    pub pre: Vec<Value>,
    /// After setup, before the engine runs.
    pub pre_agent: Vec<Value>,
    /// After the engine runs, before output collection.
    pub post_agent: Vec<Value>,
    /// After output collection.
    pub post: Vec<Value>,
}

impl WorkflowSteps {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty()
            && self.pre_agent.is_empty()
            && self.post_agent.is_empty()
            && self.post.is_empty()
    }

    /// Re-encode as the canonical map shape.
    pub fn to_value(&self) -> Value {
        let mut map = serde_yaml::Mapping::new();
        for (key, steps) in [
            ("pre", &self.pre),
            ("pre-agent", &self.pre_agent),
            ("post-agent", &self.post_agent),
            ("post", &self.post),
        ] {
            if !steps.is_empty() {
                map.insert(
                    Value::String(key.to_string()),
                    Value::Sequence(steps.clone()),
                );
            }
        }
        Value::Mapping(map)
    }
}

/// Parse the `steps:` front-matter value.
///
/// Accepts the legacy shape (a bare sequence, all steps pre-agent) and
/// the positioned map shape with `pre` / `pre-agent` / `post-agent` /
/// `post` keys.
pub fn parse_steps_from_frontmatter(value: &Value) -> Result<WorkflowSteps> {
    match value {
        Value::Sequence(seq) => Ok(WorkflowSteps {
            pre_agent: seq.clone(),
            ..Default::default()
        }),
        Value::Mapping(map) => {
            let mut steps = WorkflowSteps::default();
            for (k, v) in map {
                let Some(key) = k.as_str() else {
                    bail!("steps position keys must be strings, got {:?}", k);
                };
                let seq = match v {
                    Value::Sequence(seq) => seq.clone(),
                    Value::Null => Vec::new(),
                    other => bail!("steps.{key} must be a sequence, got {:?}", other),
                };
                match key {
                    "pre" => steps.pre = seq,
                    "pre-agent" => steps.pre_agent = seq,
                    "post-agent" => steps.post_agent = seq,
                    "post" => steps.post = seq,
                    other => bail!(
                        "unknown steps position '{other}' (expected: pre, pre-agent, post-agent, post)"
                    ),
                }
            }
            Ok(steps)
        }
        Value::Null => Ok(WorkflowSteps::default()),
        other => bail!("steps must be a sequence or a position map, got {:?}", other),
    }
}

/// Concatenate step lists, imported steps ahead of main-file steps in
/// every position.
pub fn merge_steps(main: WorkflowSteps, imported: WorkflowSteps) -> WorkflowSteps {
    let splice = |mut imp: Vec<Value>, main: Vec<Value>| {
        imp.extend(main);
        imp
    };
    WorkflowSteps {
        pre: splice(imported.pre, main.pre),
        pre_agent: splice(imported.pre_agent, main.pre_agent),
        post_agent: splice(imported.post_agent, main.post_agent),
        post: splice(imported.post, main.post),
    }
}
