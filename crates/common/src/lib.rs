//! Shellform Common Library
//!
//! Shared types, errors, and configuration for Shellform.

pub mod config;
pub mod crypto;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{GateScope, ShellformConfig};
pub use error::{Error, ErrorKind, Result};
pub use types::*;

/// Shellform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file path
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("shellform.config.toml")
}

/// Default resource definition file path
pub fn default_definitions_path() -> std::path::PathBuf {
    std::path::PathBuf::from("shellform.toml")
}
