//! Command resolution
//!
//! Decides which command text runs for a lifecycle action. A resource is
//! either driven by inline `command_*` attributes or by scripts in a
//! `command_directory`, never a mix of the two. When neither supplies a
//! command, the built-in default for the action is used if one exists.

use std::path::{Path, PathBuf};

use shellform_common::{Action, Error, ResourceConfig, Result};
use tracing::debug;

/// Built-in `read` command: copy the current trigger, byte for byte, to the
/// auxiliary channel
pub const DEFAULT_READ_COMMAND: &str = "cat >&3";

/// Scripts a command directory must contain
pub const MANDATORY_ACTIONS: [Action; 2] = [Action::Create, Action::Delete];

/// Where a resolved command came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    Inline,
    Directory(PathBuf),
    Default,
}

/// Command text ready to run for an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub action: Action,
    pub text: String,
    pub source: CommandSource,
}

impl ResolvedCommand {
    fn new(action: Action, text: impl Into<String>, source: CommandSource) -> Self {
        Self {
            action,
            text: text.into(),
            source,
        }
    }
}

/// Built-in command for an action. Only `read` has one.
pub fn default_command(action: Action) -> Option<&'static str> {
    match action {
        Action::Read => Some(DEFAULT_READ_COMMAND),
        Action::Create | Action::Update | Action::Delete => None,
    }
}

/// Resolve the command to run for `action`
pub async fn resolve(action: Action, config: &ResourceConfig) -> Result<ResolvedCommand> {
    let directory = config.command_directory();
    if config.command_create.is_empty() && directory.is_none() {
        return Err(Error::NoCommandSource);
    }

    let resolved = match directory {
        Some(dir) => resolve_from_directory(action, dir).await?,
        None => {
            let inline = config.inline_command(action);
            if inline.is_empty() {
                fallback(action)?
            } else {
                ResolvedCommand::new(action, inline, CommandSource::Inline)
            }
        }
    };

    debug!("Resolved {} command from {:?}", action, resolved.source);
    Ok(resolved)
}

async fn resolve_from_directory(action: Action, dir: &Path) -> Result<ResolvedCommand> {
    let path = dir.join(action.script_name());
    match tokio::fs::read_to_string(&path).await {
        Ok(text) if !text.is_empty() => Ok(ResolvedCommand::new(
            action,
            text,
            CommandSource::Directory(path),
        )),
        Ok(_) => fallback(action),
        Err(e) => {
            debug!("Can't read {}: {}", path.display(), e);
            match default_command(action) {
                Some(text) => Ok(ResolvedCommand::new(action, text, CommandSource::Default)),
                None => Err(Error::CommandNotFound { action, path }),
            }
        }
    }
}

fn fallback(action: Action) -> Result<ResolvedCommand> {
    default_command(action)
        .map(|text| ResolvedCommand::new(action, text, CommandSource::Default))
        .ok_or(Error::CommandNotDefined { action })
}

/// Check that a command directory holds every mandatory script.
///
/// Returns one message per missing script, naming its path.
pub fn validate_command_directory(dir: &Path) -> Vec<String> {
    MANDATORY_ACTIONS
        .iter()
        .map(|action| dir.join(action.script_name()))
        .filter(|path| !path.exists())
        .map(|path| Error::MissingScript { path }.to_string())
        .collect()
}
