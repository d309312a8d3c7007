//! MCP server configuration rendering and the gateway sidecar.

pub mod gateway;
pub mod render;
pub mod steps;

pub use gateway::{gateway_steps, rewrite_servers_for_gateway};
pub use render::{RenderedMcpConfig, render_mcp_config};
pub use steps::{container_predownload_step, setup_mcp_steps};
