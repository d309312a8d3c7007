//! Online SHA resolution with a file-backed cache.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use fl_core::CompileError;
use fl_process::{CommandRunner, gh_resolve_tag_sha};

/// One cached resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub repo: String,
    pub version: String,
    pub sha: String,
    pub fetched_at: DateTime<Utc>,
}

/// Resolves `owner/repo@version` to commit SHAs via the `gh` shim.
///
/// Cache reads are lock-free; writes serialize on one mutex.
pub struct PinResolver<'r> {
    runner: &'r dyn CommandRunner,
    cache_path: PathBuf,
    write_lock: Mutex<()>,
}

impl<'r> PinResolver<'r> {
    pub fn new(runner: &'r dyn CommandRunner, cache_path: PathBuf) -> Self {
        Self {
            runner,
            cache_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Default cache location under the user cache directory.
    pub fn default_cache_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "flowlock")
            .map(|dirs| dirs.cache_dir().join("action-pins.json"))
            .unwrap_or_else(|| PathBuf::from(".flowlock-action-pins.json"))
    }

    /// Resolve a version tag to its 40-hex commit SHA.
    pub fn resolve_sha(&self, repo: &str, version: &str) -> Result<String> {
        let base_repo = extract_base_repo(repo);
        let key = format!("{base_repo}@{version}");

        if let Some(entry) = self.load_cache()?.get(&key) {
            debug!(%key, "action pin cache hit");
            return Ok(entry.sha.clone());
        }

        let sha = gh_resolve_tag_sha(self.runner, base_repo, version).map_err(|e| {
            anyhow::Error::from(CompileError::UnresolvableAction {
                repo: base_repo.to_string(),
                version: version.to_string(),
                reason: e.to_string(),
            })
        })?;

        self.store(CacheEntry {
            repo: base_repo.to_string(),
            version: version.to_string(),
            sha: sha.clone(),
            fetched_at: Utc::now(),
        })?;
        Ok(sha)
    }

    fn load_cache(&self) -> Result<BTreeMap<String, CacheEntry>> {
        let data = match std::fs::read_to_string(&self.cache_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("cannot read '{}'", self.cache_path.display()));
            }
        };
        serde_json::from_str(&data)
            .map_err(|e| CompileError::ActionPinCacheCorrupt(e.to_string()).into())
    }

    fn store(&self, entry: CacheEntry) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| {
            CompileError::ActionPinCacheCorrupt("cache write lock poisoned".to_string())
        })?;
        let mut cache = self.load_cache()?;
        cache.insert(format!("{}@{}", entry.repo, entry.version), entry);
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&cache)?;
        std::fs::write(&self.cache_path, json)
            .with_context(|| format!("cannot write '{}'", self.cache_path.display()))?;
        Ok(())
    }
}

/// Strip a sub-action path: `owner/repo/path/to/action` -> `owner/repo`.
pub fn extract_base_repo(repo: &str) -> &str {
    let mut slashes = 0usize;
    for (idx, ch) in repo.char_indices() {
        if ch == '/' {
            slashes += 1;
            if slashes == 2 {
                return &repo[..idx];
            }
        }
    }
    repo
}
