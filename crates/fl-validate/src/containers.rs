//! Container image existence probes for stdio MCP servers.

use tracing::debug;

use fl_config::WorkflowSpec;
use fl_core::CompileError;
use fl_process::{CommandRunner, docker_image_exists};

/// Probe `docker image inspect` for every containerized stdio server.
pub fn validate_container_images(
    spec: &WorkflowSpec,
    runner: &dyn CommandRunner,
) -> Vec<CompileError> {
    let mut errors = Vec::new();
    for (name, server) in spec.all_mcp_servers() {
        let Some(image) = server.container_image() else {
            continue;
        };
        match docker_image_exists(runner, image) {
            Ok(true) => {}
            Ok(false) => errors.push(CompileError::ContainerImageUnavailable {
                image: image.to_string(),
                server: name.clone(),
            }),
            Err(e) => {
                // No docker on this machine: cannot probe, do not block.
                debug!(server = %name, error = %e, "docker probe unavailable");
            }
        }
    }
    errors
}
