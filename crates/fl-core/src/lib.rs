//! Shared types and error taxonomy for the workflow compiler.

pub mod console;
pub mod error;
pub mod registry;
pub mod types;

pub use console::{bulleted, format_error, format_info, format_warning};
pub use error::CompileError;
pub use registry::{default_engine_id, get_engine_id, register_engine};
pub use types::{EngineId, Severity};
