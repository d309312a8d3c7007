//! Shared state threaded through the job builders.

use fl_config::WorkflowSpec;
use fl_process::CommandRunner;

/// Inputs every job builder needs.
pub struct BuildContext<'a> {
    pub spec: &'a WorkflowSpec,
    /// Runner for optional payload minification; `None` embeds payloads
    /// unminified.
    pub minify_runner: Option<&'a dyn CommandRunner>,
}

impl<'a> BuildContext<'a> {
    pub fn new(spec: &'a WorkflowSpec) -> Self {
        Self {
            spec,
            minify_runner: None,
        }
    }

    /// True when a threat-detection job interposes between the agent
    /// and the sinks.
    pub fn detection_enabled(&self) -> bool {
        self.spec
            .safe_outputs
            .as_ref()
            .and_then(|so| so.threat_detection.as_ref())
            .is_some_and(|td| td.enabled)
    }
}
