//! Deterministic YAML/JS/shell emission.
//!
//! Everything the compiler writes funnels through this crate: the YAML
//! string builder, indentation-aware JavaScript embedding, shell
//! heredocs, and the platform line-size limits.

pub mod heredoc;
pub mod js;
pub mod limits;
pub mod steps;
pub mod yaml;

pub use heredoc::append_heredoc;
pub use js::{embed_js, strip_js_comments, wrap_js_lines};
pub use limits::{EMIT_LINE_LIMIT, PRECHECK_LINE_LIMIT, check_payload_lines, enforce_line_limits};
pub use steps::{STEP_INDENT, render_step_value};
pub use yaml::{YamlBuilder, indent_lines, yaml_quote};
