//! Resource Definition Values
//!
//! Resource definitions arrive as loosely typed documents (TOML or JSON).
//! This module holds the dynamic value model and the conversion into typed
//! `ResourceConfig`, which is the only place untyped data is accepted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use shellform_common::{Error, ResourceConfig, Result, DEFAULT_WORKING_DIRECTORY};

/// Dynamic value decoded from a resource definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_map()?.get(key)
    }

    /// Short type description for error messages
    pub fn type_label(&self) -> &'static str {
        match self {
            DynamicValue::Null => "null",
            DynamicValue::Bool(_) => "bool",
            DynamicValue::Number(_) => "number",
            DynamicValue::String(_) => "string",
            DynamicValue::List(_) => "list",
            DynamicValue::Map(_) => "map",
        }
    }
}

impl Default for DynamicValue {
    fn default() -> Self {
        DynamicValue::Null
    }
}

/// Decode a JSON document into a DynamicValue
pub fn decode_dynamic_value(data: &[u8]) -> Result<DynamicValue> {
    if data.is_empty() {
        return Ok(DynamicValue::Null);
    }
    Ok(serde_json::from_slice(data)?)
}

/// Helper to extract a string attribute from a DynamicValue
pub fn get_string_attr(value: &DynamicValue, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_string())
        .unwrap_or("")
        .to_string()
}

/// Helper to extract an optional string attribute from a DynamicValue
pub fn get_optional_string_attr(value: &DynamicValue, key: &str) -> Option<String> {
    value.get(key).and_then(|v| match v {
        DynamicValue::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

/// Helper to extract a bool attribute from a DynamicValue
pub fn get_bool_attr(value: &DynamicValue, key: &str, default: bool) -> bool {
    value
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

/// Helper to extract a string-to-string map attribute.
///
/// Missing or null attributes are an empty map; anything else that is not a
/// map of strings is an error naming the offending key.
pub fn get_string_map_attr(
    value: &DynamicValue,
    key: &str,
) -> std::result::Result<BTreeMap<String, String>, String> {
    let attr = match value.get(key) {
        None | Some(DynamicValue::Null) => return Ok(BTreeMap::new()),
        Some(attr) => attr,
    };

    let map = attr
        .as_map()
        .ok_or_else(|| format!("{} must be a map of strings, got {}", key, attr.type_label()))?;

    map.iter()
        .map(|(k, v)| match v {
            DynamicValue::String(s) => Ok((k.clone(), s.clone())),
            other => Err(format!(
                "{}.{} must be a string, got {}",
                key,
                k,
                other.type_label()
            )),
        })
        .collect()
}

/// Convert a validated definition into a typed configuration
pub fn config_from_dynamic(value: &DynamicValue) -> Result<ResourceConfig> {
    let mut errors = Vec::new();

    let environment = get_string_map_attr(value, "environment").unwrap_or_else(|e| {
        errors.push(e);
        BTreeMap::new()
    });
    let recreate_triggers = get_string_map_attr(value, "recreate_triggers").unwrap_or_else(|e| {
        errors.push(e);
        BTreeMap::new()
    });

    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    Ok(ResourceConfig {
        command_directory: get_optional_string_attr(value, "command_directory").map(PathBuf::from),
        command_create: get_string_attr(value, "command_create"),
        command_read: get_string_attr(value, "command_read"),
        command_update: get_string_attr(value, "command_update"),
        command_delete: get_string_attr(value, "command_delete"),
        idempotent: get_bool_attr(value, "idempotent", false),
        environment,
        working_directory: PathBuf::from(
            get_optional_string_attr(value, "working_directory")
                .unwrap_or_else(|| DEFAULT_WORKING_DIRECTORY.to_string()),
        ),
        recreate_triggers,
    })
}
