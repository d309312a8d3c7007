//! Engine id registry: lookup by id and id-prefix, plus test injection.
//!
//! This is the single resolution path for engine ids; the front-matter
//! parser reaches it through [`EngineId::from_str`].
//!
//! [`EngineId::from_str`]: crate::types::EngineId

use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};

use crate::types::EngineId;

fn registry() -> &'static RwLock<BTreeMap<String, EngineId>> {
    static REGISTRY: OnceLock<RwLock<BTreeMap<String, EngineId>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = BTreeMap::new();
        map.insert("claude".to_string(), EngineId::Claude);
        map.insert("copilot".to_string(), EngineId::Copilot);
        map.insert("codex".to_string(), EngineId::Codex);
        map.insert("gemini".to_string(), EngineId::Gemini);
        map.insert("custom".to_string(), EngineId::Custom);
        map.insert("opencode".to_string(), EngineId::Custom);
        RwLock::new(map)
    })
}

/// The engine used when front matter names none.
pub fn default_engine_id() -> EngineId {
    EngineId::Claude
}

/// Look up an engine by id, falling back to the longest registered
/// prefix (`codex-experimental` resolves to `codex`).
pub fn get_engine_id(id: &str) -> Option<EngineId> {
    let map = registry().read().ok()?;
    if let Some(engine) = map.get(id) {
        return Some(*engine);
    }
    map.iter()
        .filter(|(key, _)| id.starts_with(&format!("{key}-")))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, engine)| *engine)
}

/// Register an engine id at runtime. Primarily for tests.
pub fn register_engine(id: &str, engine: EngineId) {
    if let Ok(mut map) = registry().write() {
        map.insert(id.to_string(), engine);
    }
}
