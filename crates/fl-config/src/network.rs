//! Egress network policy parsed from the `network:` front-matter key.

use anyhow::{Result, bail};
use serde_yaml::Value;

/// Egress allowed for the agent job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NetworkPermissions {
    /// Curated default domain profile (package registries, GitHub).
    #[default]
    Defaults,
    /// Unrestricted egress. Rejected in strict mode.
    Wildcard,
    /// Explicit allow-list; empty means deny all egress.
    Allowed(Vec<String>),
}

impl NetworkPermissions {
    /// Domains in the curated defaults profile.
    pub fn default_domains() -> &'static [&'static str] {
        &[
            "api.github.com",
            "github.com",
            "objects.githubusercontent.com",
            "raw.githubusercontent.com",
            "registry.npmjs.org",
            "pypi.org",
            "files.pythonhosted.org",
            "crates.io",
            "static.crates.io",
        ]
    }

    /// The effective allow-list, or `None` for unrestricted egress.
    pub fn allowed_domains(&self) -> Option<Vec<String>> {
        match self {
            Self::Defaults => Some(
                Self::default_domains()
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
            ),
            Self::Wildcard => None,
            Self::Allowed(domains) => Some(domains.clone()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

/// Parse the `network:` value: `defaults`, `"*"`, or `{allowed: [..]}`.
pub fn parse_network(value: &Value) -> Result<NetworkPermissions> {
    match value {
        Value::String(s) if s == "defaults" => Ok(NetworkPermissions::Defaults),
        Value::String(s) if s == "*" => Ok(NetworkPermissions::Wildcard),
        Value::String(other) => {
            bail!("network must be 'defaults', '*', or a mapping with 'allowed', got '{other}'")
        }
        Value::Mapping(map) => {
            let Some(allowed) = map.get("allowed") else {
                bail!("network mapping requires an 'allowed' list");
            };
            let Value::Sequence(seq) = allowed else {
                bail!("network.allowed must be a sequence of domains");
            };
            let mut domains = Vec::with_capacity(seq.len());
            for entry in seq {
                let Some(domain) = entry.as_str() else {
                    bail!("network.allowed entries must be strings, got {:?}", entry);
                };
                domains.push(domain.to_string());
            }
            Ok(NetworkPermissions::Allowed(domains))
        }
        other => bail!("network must be 'defaults', '*', or a mapping, got {:?}", other),
    }
}
