//! Shellform configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellformConfig {
    /// Path of the JSON state file
    pub state_path: PathBuf,

    /// Shell configuration
    pub shell: ShellConfig,

    /// Execution gate configuration
    pub gate: GateConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Default for ShellformConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("shellform.state.json"),
            shell: ShellConfig::default(),
            gate: GateConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Shell used to interpret command text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Interpreter invoked as `<program> -c <command>`
    pub program: PathBuf,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/bin/sh"),
        }
    }
}

/// Granularity of lifecycle serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateScope {
    /// One lock shared by every resource of a kind
    #[default]
    Kind,
    /// One lock per resource address
    Resource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub scope: GateScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ShellformConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
