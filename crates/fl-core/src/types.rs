use serde::{Deserialize, Serialize};

/// Agentic engine selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    Claude,
    Copilot,
    Codex,
    Gemini,
    Custom,
}

impl EngineId {
    /// Returns the front-matter-facing id for this engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Copilot => "copilot",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Custom => "custom",
        }
    }

    /// All engine ids, in the order shown in error messages.
    pub fn all() -> &'static [EngineId] {
        &[
            Self::Claude,
            Self::Copilot,
            Self::Codex,
            Self::Gemini,
            Self::Custom,
        ]
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EngineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The registry handles exact ids, experimental suffixes like
        // "codex-experimental", and test-registered ids.
        crate::registry::get_engine_id(s).ok_or_else(|| {
            format!(
                "Unknown engine '{}'. Known engines: claude, codex, copilot, custom, gemini",
                s
            )
        })
    }
}

/// Severity of a diagnostic emitted during compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}
