//! The compilation pipeline: front matter in, pinned lock file out.

pub mod defaults;
pub mod emit;
pub mod pins_pass;
pub mod pipeline;

pub use pipeline::{CompiledWorkflow, CompilerOptions, compile_directory, compile_workflow};
