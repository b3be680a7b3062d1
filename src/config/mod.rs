pub mod args;
mod r#impl;
mod structs;
pub mod validators;

pub use args::{Cli, Command};
pub use r#impl::{get_config, init_config};
pub use structs::*;
pub use validators::{ValidatedConfig, validate_static_config};
