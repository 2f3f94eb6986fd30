//! Resource schemas
//!
//! Declares the attributes of each resource type and checks definitions
//! against them before any lifecycle operation runs.

use std::path::Path;

use serde::Serialize;
use shellform_common::{DEFAULT_UPDATE_TRIGGER, DEFAULT_WORKING_DIRECTORY, SHELL_SCRIPT_TYPE};

use crate::diagnostics::Diagnostic;
use crate::resolver::validate_command_directory;
use crate::state::{get_optional_string_attr, get_string_attr, get_string_map_attr, DynamicValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    StringMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    Optional,
    /// Set by the provider, never by the user
    Computed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeType,
    pub mode: AttributeMode,
    /// Changing the value replaces the resource instead of updating it
    pub force_new: bool,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType, mode: AttributeMode) -> Self {
        Self {
            name,
            kind,
            mode,
            force_new: false,
            default: None,
            description: "",
        }
    }

    fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn accepts(&self, value: &DynamicValue) -> bool {
        match (self.kind, value) {
            (_, DynamicValue::Null) => true,
            (AttributeType::String, DynamicValue::String(_)) => true,
            (AttributeType::Bool, DynamicValue::Bool(_)) => true,
            (AttributeType::StringMap, DynamicValue::Map(_)) => true,
            _ => false,
        }
    }
}

/// Schema of a single resource type
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub type_name: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.force_new)
    }

    /// Check attribute names, modes, and types
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let map = match config.as_map() {
            Some(map) => map,
            None => {
                return vec![Diagnostic::error(
                    "Invalid resource definition",
                    format!("{} definition must be a map, got {}", self.type_name, config.type_label()),
                )]
            }
        };

        let mut diagnostics = Vec::new();
        for (name, value) in map {
            let attribute = match self.attribute(name) {
                Some(attribute) => attribute,
                None => {
                    diagnostics.push(
                        Diagnostic::error(
                            "Unsupported attribute",
                            format!("{} has no attribute named {:?}", self.type_name, name),
                        )
                        .with_attribute(name.clone()),
                    );
                    continue;
                }
            };

            if attribute.mode == AttributeMode::Computed {
                diagnostics.push(
                    Diagnostic::error(
                        "Computed attribute",
                        format!("{} is computed and cannot be set", name),
                    )
                    .with_attribute(name.clone()),
                );
            } else if !attribute.accepts(value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!("{} must be {:?}, got {}", name, attribute.kind, value.type_label()),
                    )
                    .with_attribute(name.clone()),
                );
            } else if attribute.kind == AttributeType::StringMap {
                if let Err(detail) = get_string_map_attr(config, name) {
                    diagnostics.push(
                        Diagnostic::error("Incorrect attribute value type", detail)
                            .with_attribute(name.clone()),
                    );
                }
            }
        }

        diagnostics
    }
}

/// Schema for `shell_script`
pub fn shell_script_schema() -> Schema {
    use AttributeMode::{Computed, Optional};
    use AttributeType as T;

    Schema {
        type_name: SHELL_SCRIPT_TYPE,
        attributes: vec![
            Attribute::new("command_directory", T::String, Optional)
                .describe("Directory holding create.sh, delete.sh and optionally read.sh and update.sh"),
            Attribute::new("command_create", T::String, Optional)
                .describe("Command run to create the resource"),
            Attribute::new("command_read", T::String, Optional)
                .describe("Command run to refresh the resource"),
            Attribute::new("command_update", T::String, Optional)
                .describe("Command run to update the resource in place"),
            Attribute::new("command_delete", T::String, Optional)
                .describe("Command run to delete the resource"),
            Attribute::new("idempotent", T::Bool, Optional)
                .force_new()
                .default_value("false")
                .describe("Re-run the create command on update"),
            Attribute::new("environment", T::StringMap, Optional)
                .describe("Environment variables for every command"),
            Attribute::new("working_directory", T::String, Optional)
                .default_value(DEFAULT_WORKING_DIRECTORY)
                .describe("Directory commands run in"),
            Attribute::new("recreate_triggers", T::StringMap, Optional)
                .force_new()
                .describe("Values whose change replaces the resource"),
            Attribute::new("id", T::String, Computed),
            Attribute::new("update_trigger", T::String, Computed)
                .default_value(DEFAULT_UPDATE_TRIGGER)
                .describe("Last auxiliary output, piped to later commands"),
            Attribute::new("output", T::StringMap, Computed)
                .describe("Last auxiliary output parsed as a flat JSON object"),
        ],
    }
}

/// Checks that depend on more than one attribute or on the filesystem
pub fn validate_shell_script(config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    match get_optional_string_attr(config, "command_directory") {
        Some(dir) => {
            diagnostics.extend(
                validate_command_directory(Path::new(&dir))
                    .into_iter()
                    .map(|detail| {
                        Diagnostic::error("Missing command script", detail)
                            .with_attribute("command_directory")
                    }),
            );

            let inline: Vec<&str> = ["command_create", "command_read", "command_update", "command_delete"]
                .into_iter()
                .filter(|name| !get_string_attr(config, name).is_empty())
                .collect();
            if !inline.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(
                        "Inline commands ignored",
                        format!(
                            "{} are ignored because command_directory is set",
                            inline.join(", ")
                        ),
                    )
                    .with_attribute("command_directory"),
                );
            }
        }
        None => {
            for name in ["command_create", "command_delete"] {
                if get_string_attr(config, name).is_empty() {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument {:?} is required unless command_directory is set", name),
                        )
                        .with_attribute(name),
                    );
                }
            }
        }
    }

    diagnostics
}
