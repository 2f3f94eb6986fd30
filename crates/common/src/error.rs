//! Error types for Shellform

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Action;

/// Result type alias using Shellform Error
pub type Result<T> = std::result::Result<T, Error>;

/// Shellform error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("No explicit or inline commands are defined, invalid definition")]
    NoCommandSource,

    #[error("Can't find required scripts in command_directory: {}", .path.display())]
    MissingScript { path: PathBuf },

    #[error("Can't find command for action {action} at {}", .path.display())]
    CommandNotFound { action: Action, path: PathBuf },

    #[error("No command defined or found or could be defaulted for action: {action}")]
    CommandNotDefined { action: Action },

    #[error("Command for action {action} failed with {}: {stderr}", exit_description(.code))]
    CommandFailed {
        action: Action,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to launch command for action {action}: {source}")]
    Spawn {
        action: Action,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad classification used when reporting errors to a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No command source, missing mandatory scripts, malformed definitions
    Configuration,
    /// An action has no inline command, script, or built-in default
    Resolution,
    /// The user's command failed or could not be launched
    Execution,
    /// Everything else
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoCommandSource
            | Error::MissingScript { .. }
            | Error::InvalidConfig(_)
            | Error::Validation(_)
            | Error::ConfigParse(_) => ErrorKind::Configuration,
            Error::CommandNotFound { .. } | Error::CommandNotDefined { .. } => {
                ErrorKind::Resolution
            }
            Error::CommandFailed { .. } | Error::Spawn { .. } => ErrorKind::Execution,
            Error::Io(_) | Error::Serialization(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}
