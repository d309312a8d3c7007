//! Workflow source loading: front-matter splitting, import resolution,
//! and step-list parsing.

pub mod imports;
pub mod source;
pub mod steps;

pub use imports::resolve_imports;
pub use source::{WorkflowSource, load, split_frontmatter};
pub use steps::{WorkflowSteps, merge_steps, parse_steps_from_frontmatter};
