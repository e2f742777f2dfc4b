//! Launcher configuration.
//!
//! - `types` - `LauncherConfig`, `LaunchSettings`, `InstanceDefinition`
//! - `parser` - discovery and TOML/JSON/YAML loading
//! - `validation` - semantic checks run after loading

mod parser;
mod types;
mod validation;

pub use parser::*;
pub use types::*;
