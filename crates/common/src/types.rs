//! Core types for Shellform

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resource type name for script-driven resources
pub const SHELL_SCRIPT_TYPE: &str = "shell_script";

/// Initial value of `update_trigger` before any command output is captured
pub const DEFAULT_UPDATE_TRIGGER: &str = "created";

/// Default working directory for command invocations
pub const DEFAULT_WORKING_DIRECTORY: &str = ".";

/// Lifecycle action, selects which command is resolved and run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// File name of this action's script inside a command directory
    pub fn script_name(&self) -> String {
        format!("{}.sh", self.as_str())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied resource configuration, immutable for the duration of an apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_directory: Option<PathBuf>,

    #[serde(default)]
    pub command_create: String,

    #[serde(default)]
    pub command_read: String,

    #[serde(default)]
    pub command_update: String,

    #[serde(default)]
    pub command_delete: String,

    /// Update re-runs the create command instead of a dedicated update command
    #[serde(default)]
    pub idempotent: bool,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,

    /// Any change to these values forces the resource to be replaced
    #[serde(default)]
    pub recreate_triggers: BTreeMap<String, String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            command_directory: None,
            command_create: String::new(),
            command_read: String::new(),
            command_update: String::new(),
            command_delete: String::new(),
            idempotent: false,
            environment: BTreeMap::new(),
            working_directory: default_working_directory(),
            recreate_triggers: BTreeMap::new(),
        }
    }
}

impl ResourceConfig {
    /// Inline command text for an action; empty when unset
    pub fn inline_command(&self, action: Action) -> &str {
        match action {
            Action::Create => &self.command_create,
            Action::Read => &self.command_read,
            Action::Update => &self.command_update,
            Action::Delete => &self.command_delete,
        }
    }

    /// Command directory, treating an empty path as unset
    pub fn command_directory(&self) -> Option<&PathBuf> {
        self.command_directory
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Action whose command an update runs
    pub fn update_action(&self) -> Action {
        if self.idempotent {
            Action::Create
        } else {
            Action::Update
        }
    }
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(DEFAULT_WORKING_DIRECTORY)
}

/// Persisted, computed resource attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Opaque identifier; empty means the resource does not exist
    #[serde(default)]
    pub id: String,

    /// Output of the last successful create/read, fed back as stdin
    #[serde(default = "default_update_trigger")]
    pub update_trigger: String,

    #[serde(default)]
    pub output: BTreeMap<String, String>,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            id: String::new(),
            update_trigger: default_update_trigger(),
            output: BTreeMap::new(),
        }
    }
}

impl ResourceState {
    /// State seeded with a known identifier, used by import
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    /// Mark the resource as gone
    pub fn clear(&mut self) {
        self.id.clear();
    }
}

fn default_update_trigger() -> String {
    DEFAULT_UPDATE_TRIGGER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_script_names() {
        assert_eq!(Action::Create.script_name(), "create.sh");
        assert_eq!(Action::Delete.script_name(), "delete.sh");
        assert_eq!(Action::Read.to_string(), "read");
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: ResourceConfig = toml::from_str("command_create = \"true\"").unwrap();
        assert_eq!(config.working_directory, PathBuf::from("."));
        assert!(!config.idempotent);
        assert!(config.environment.is_empty());
        assert_eq!(config.inline_command(Action::Create), "true");
        assert_eq!(config.inline_command(Action::Read), "");
    }

    #[test]
    fn test_update_action_follows_idempotent_flag() {
        let mut config = ResourceConfig::default();
        assert_eq!(config.update_action(), Action::Update);
        config.idempotent = true;
        assert_eq!(config.update_action(), Action::Create);
    }

    #[test]
    fn test_empty_command_directory_is_unset() {
        let config = ResourceConfig {
            command_directory: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(config.command_directory().is_none());
    }

    #[test]
    fn test_state_defaults() {
        let state = ResourceState::default();
        assert!(!state.exists());
        assert_eq!(state.update_trigger, "created");

        let mut state = ResourceState::with_id("abc");
        assert!(state.exists());
        state.clear();
        assert!(!state.exists());
    }
}
