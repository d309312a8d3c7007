//! Action pin registry and SHA resolution.
//!
//! Every `uses:` reference the compiler emits is pinned to a 40-hex
//! commit SHA. The static registry covers the actions the compiler
//! itself emits; anything else resolves through the `gh` shim with a
//! file-backed cache.

pub mod registry;
pub mod resolver;

pub use registry::{ActionPin, builtin_pins, get_action_pin, register_pin};
pub use resolver::{PinResolver, extract_base_repo};
