//! Parsing and validation of `regbench.toml` testbench configuration files.
//!
//! This crate reads the bench configuration and produces a strongly-typed
//! [`BenchConfig`]. Every field has a default, so a missing file or an empty
//! one yields the same bench the tests were written against.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, load_config_or_default, CONFIG_FILE_NAME,
};
pub use types::*;
