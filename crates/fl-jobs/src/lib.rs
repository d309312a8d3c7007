//! Job synthesis: the job graph, the activation/agent/detection/
//! conclusion jobs, one builder per safe-output sink, and the
//! concurrency policy.

pub mod activation;
pub mod agent;
pub mod concurrency;
pub mod conclusion;
pub mod context;
pub mod detection;
pub mod job;
pub mod sinks;
mod steps_util;

pub use activation::build_activation;
pub use agent::build_agent;
pub use concurrency::derive_concurrency;
pub use conclusion::build_conclusion;
pub use context::BuildContext;
pub use detection::build_detection;
pub use job::{Job, JobGraph, JobPermissions};
pub use sinks::build_safe_output_jobs;
