//! Engine abstraction: the capability surface over the five coding-agent
//! engines, plus the embedded JavaScript payload registry.

pub mod assets;
pub mod engine;
pub mod metrics;

pub use assets::{get_script, script_names};
pub use engine::{Engine, McpDialect};
pub use metrics::LogMetrics;
