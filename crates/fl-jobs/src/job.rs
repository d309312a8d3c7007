//! Immutable job records and the insertion-ordered job graph.

use anyhow::{Result, bail};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use fl_emit::YamlBuilder;

/// Job-level permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPermissions {
    ReadAll,
    WriteAll,
    /// Scope -> level, emitted in sorted order.
    Scoped(BTreeMap<String, String>),
}

impl JobPermissions {
    /// Build a scoped set from `(scope, level)` pairs.
    pub fn scoped(pairs: &[(&str, &str)]) -> Self {
        Self::Scoped(
            pairs
                .iter()
                .map(|(scope, level)| (scope.to_string(), level.to_string()))
                .collect(),
        )
    }

    /// Convert a user-supplied permissions value, forcing
    /// `contents: read` when the map omits it.
    pub fn from_value_with_contents_read(value: &Value) -> Self {
        match Self::from_value_verbatim(value) {
            Self::Scoped(mut scoped) => {
                scoped
                    .entry("contents".to_string())
                    .or_insert_with(|| "read".to_string());
                Self::Scoped(scoped)
            }
            other => other,
        }
    }

    /// Convert a user-supplied permissions value as written.
    pub fn from_value_verbatim(value: &Value) -> Self {
        match value {
            Value::String(s) if s == "read-all" => Self::ReadAll,
            Value::String(s) if s == "write-all" => Self::WriteAll,
            Value::Mapping(map) => {
                let mut scoped = BTreeMap::new();
                for (k, v) in map {
                    if let (Some(scope), Some(level)) = (k.as_str(), v.as_str()) {
                        scoped.insert(scope.to_string(), level.to_string());
                    }
                }
                Self::Scoped(scoped)
            }
            _ => Self::Scoped(BTreeMap::new()),
        }
    }
}

/// One synthesized GitHub Actions job. Immutable once built; builders
/// assemble a record and append it to the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Key under `jobs:`, constrained to `[a-z_][a-z0-9_]*`.
    pub name: String,
    /// Guard expression (emitted as `if:`), without `${{ }}` wrapping.
    pub if_cond: Option<String>,
    pub runs_on: String,
    pub permissions: Option<JobPermissions>,
    pub env: BTreeMap<String, String>,
    pub needs: Vec<String>,
    /// Output name -> expression.
    pub outputs: Vec<(String, String)>,
    /// Final-coordinate step blocks.
    pub steps: Vec<String>,
    pub timeout_minutes: Option<u64>,
}

impl Job {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            if_cond: None,
            runs_on: "ubuntu-latest".to_string(),
            permissions: None,
            env: BTreeMap::new(),
            needs: Vec::new(),
            outputs: Vec::new(),
            steps: Vec::new(),
            timeout_minutes: None,
        }
    }

    /// Render this job under `jobs:` (two-space base indent).
    pub fn render(&self) -> String {
        let mut b = YamlBuilder::new();
        b.line(2, &format!("{}:", self.name));
        match self.needs.len() {
            0 => {}
            1 => b.line(4, &format!("needs: {}", self.needs[0])),
            _ => {
                b.line(4, "needs:");
                for need in &self.needs {
                    b.line(6, &format!("- {need}"));
                }
            }
        }
        if let Some(cond) = &self.if_cond {
            b.line(4, &format!("if: {cond}"));
        }
        b.line(4, &format!("runs-on: {}", self.runs_on));
        match &self.permissions {
            None => {}
            Some(JobPermissions::ReadAll) => b.line(4, "permissions: read-all"),
            Some(JobPermissions::WriteAll) => b.line(4, "permissions: write-all"),
            Some(JobPermissions::Scoped(map)) if map.is_empty() => {
                b.line(4, "permissions: {}");
            }
            Some(JobPermissions::Scoped(map)) => {
                b.line(4, "permissions:");
                for (scope, level) in map {
                    b.line(6, &format!("{scope}: {level}"));
                }
            }
        }
        if let Some(timeout) = self.timeout_minutes {
            b.line(4, &format!("timeout-minutes: {timeout}"));
        }
        if !self.env.is_empty() {
            b.line(4, "env:");
            for (key, value) in &self.env {
                b.line(6, &format!("{key}: {value}"));
            }
        }
        if !self.outputs.is_empty() {
            b.line(4, "outputs:");
            for (name, expr) in &self.outputs {
                b.line(6, &format!("{name}: {expr}"));
            }
        }
        if !self.steps.is_empty() {
            b.line(4, "steps:");
            for step in &self.steps {
                b.raw(step);
                b.raw("\n");
            }
        }
        b.finish()
    }
}

/// Insertion-ordered collection of jobs; emission order is insertion
/// order, which keeps lock files byte-identical across runs.
#[derive(Debug, Default)]
pub struct JobGraph {
    jobs: Vec<Job>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job, enforcing the name pattern and uniqueness.
    pub fn add(&mut self, job: Job) -> Result<()> {
        if !valid_job_name(&job.name) {
            bail!(
                "invalid job name '{}': must match [a-z_][a-z0-9_]*",
                job.name
            );
        }
        if self.jobs.iter().any(|j| j.name == job.name) {
            bail!("duplicate job name '{}'", job.name);
        }
        self.jobs.push(job);
        Ok(())
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Check referential integrity: every `needs` entry must name a job
    /// in the graph.
    pub fn validate(&self) -> Result<()> {
        let names: BTreeSet<&str> = self.jobs.iter().map(|j| j.name.as_str()).collect();
        for job in &self.jobs {
            for need in &job.needs {
                if !names.contains(need.as_str()) {
                    bail!("job '{}' needs unknown job '{}'", job.name, need);
                }
            }
        }
        Ok(())
    }

    /// Transitive closure of a job's dependencies.
    pub fn transitive_needs(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            let Some(job) = self.get(&current) else {
                continue;
            };
            for need in &job.needs {
                if seen.insert(need.clone()) {
                    stack.push(need.clone());
                }
            }
        }
        seen
    }

    /// Render all jobs under a `jobs:` header.
    pub fn render(&self) -> String {
        let mut out = String::from("jobs:\n");
        for job in &self.jobs {
            out.push_str(&job.render());
        }
        out
    }
}

fn valid_job_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
