//! CLI Commands

pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod validate;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use shellform_common::ResourceConfig;
use shellform_provider::diagnostics::has_errors;
use shellform_provider::ShellformProvider;

use crate::output::{print_diagnostics, OutputFormat};
use crate::workspace::{load_definitions, StateFile};

/// Everything a command needs
pub struct Context {
    pub provider: ShellformProvider,
    pub definitions_path: PathBuf,
    pub state_path: PathBuf,
    pub format: OutputFormat,
}

/// A validated definition
#[derive(Debug, Clone)]
pub struct Desired {
    pub type_name: String,
    pub config: ResourceConfig,
}

impl Context {
    pub fn new(
        provider: ShellformProvider,
        definitions_path: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
        format: OutputFormat,
    ) -> Self {
        Self {
            provider,
            definitions_path: definitions_path.into(),
            state_path: state_path.into(),
            format,
        }
    }

    pub fn load_state(&self) -> Result<StateFile> {
        StateFile::load(&self.state_path)
    }

    pub fn save_state(&self, state: &StateFile) -> Result<()> {
        state.save(&self.state_path)
    }

    /// Validate and decode every definition, printing diagnostics as it goes
    pub fn desired(&self) -> Result<BTreeMap<String, Desired>> {
        let definitions = load_definitions(&self.definitions_path)?;

        let mut desired = BTreeMap::new();
        let mut invalid = 0;
        for (address, definition) in definitions {
            match self
                .provider
                .decode_resource_config(&definition.type_name, &definition.body)
            {
                Ok(config) => {
                    desired.insert(
                        address,
                        Desired {
                            type_name: definition.type_name,
                            config,
                        },
                    );
                }
                Err(diagnostics) => {
                    print_diagnostics(&address, &diagnostics);
                    if has_errors(&diagnostics) {
                        invalid += 1;
                    }
                }
            }
        }

        if invalid > 0 {
            bail!(
                "{} resource definition(s) in {} are invalid",
                invalid,
                self.definitions_path.display()
            );
        }
        Ok(desired)
    }
}
