//! Resource definitions and the state file

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shellform_common::{ResourceConfig, ResourceState, SHELL_SCRIPT_TYPE};
use shellform_provider::state::decode_dynamic_value;
use shellform_provider::DynamicValue;

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

/// A resource as written by the user
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub type_name: String,
    /// Attributes, without the `type` key
    pub body: DynamicValue,
}

/// Load `[resources.<address>]` tables from a TOML or JSON file
pub fn load_definitions(path: &Path) -> Result<BTreeMap<String, Definition>> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read definitions from {}", path.display()))?;

    let document: DynamicValue = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => decode_dynamic_value(&content)?,
        _ => {
            let text = String::from_utf8(content)
                .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
            toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?
        }
    };

    let resources = match document.get("resources") {
        None | Some(DynamicValue::Null) => return Ok(BTreeMap::new()),
        Some(DynamicValue::Map(resources)) => resources,
        Some(other) => bail!("resources must be a table, got {}", other.type_label()),
    };

    resources
        .iter()
        .map(|(address, value)| {
            let mut attributes = match value {
                DynamicValue::Map(attributes) => attributes.clone(),
                other => bail!("resource {} must be a table, got {}", address, other.type_label()),
            };
            let type_name = match attributes.remove("type") {
                None => SHELL_SCRIPT_TYPE.to_string(),
                Some(DynamicValue::String(type_name)) => type_name,
                Some(other) => bail!("{}.type must be a string, got {}", address, other.type_label()),
            };
            Ok((
                address.clone(),
                Definition {
                    type_name,
                    body: DynamicValue::Map(attributes),
                },
            ))
        })
        .collect()
}

/// Everything recorded about one applied resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Configuration the resource was last applied with
    pub config: ResourceConfig,
    pub state: ResourceState,
    /// `update_trigger` as of the last apply, compared after refresh to detect drift
    pub applied_trigger: String,
}

impl ResourceRecord {
    pub fn new(type_name: impl Into<String>, config: ResourceConfig, state: ResourceState) -> Self {
        let applied_trigger = state.update_trigger.clone();
        Self {
            type_name: type_name.into(),
            config,
            state,
            applied_trigger,
        }
    }
}

/// Persisted state of every managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Load state, starting empty when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read state from {}", path.display()))?;
        let state: Self = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse state file {}", path.display()))?;
        if state.version != STATE_VERSION {
            bail!(
                "Unsupported state file version {} in {} (expected {})",
                state.version,
                path.display(),
                STATE_VERSION
            );
        }
        Ok(state)
    }

    /// Write state through a temporary file so a crash never truncates it
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to write state to {}", path.display()))?;
        Ok(())
    }
}
