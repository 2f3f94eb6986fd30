//! Shellform Provider Implementation
//!
//! Host-facing surface: validation, refresh, planning, apply, and import,
//! dispatched by resource type.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use shellform_common::{
    Error, GateScope, ResourceConfig, ResourceState, Result, ShellformConfig, SHELL_SCRIPT_TYPE,
};
use tracing::{debug, info, warn};

use crate::diagnostics::{has_errors, Diagnostic};
use crate::gate::{gate_key, ExecutionGate};
use crate::resources::{shell_script::ShellScriptResource, Resource};
use crate::runner::{CommandRunner, ShellRunner};
use crate::schema::{self, Schema};
use crate::state::{config_from_dynamic, DynamicValue};

/// What applying a definition will do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedChange {
    NoOp,
    Create,
    /// Update in place; reasons name changed attributes or detected drift
    Update { reasons: Vec<String> },
    /// Delete then create because force-new attributes changed
    Replace { attributes: Vec<String> },
    Delete,
}

impl PlannedChange {
    pub fn is_noop(&self) -> bool {
        matches!(self, PlannedChange::NoOp)
    }
}

/// A resource as it was last applied
#[derive(Debug, Clone, Copy)]
pub struct PriorResource<'a> {
    pub config: &'a ResourceConfig,
    pub state: &'a ResourceState,
    /// `update_trigger` recorded when the resource was last applied
    pub applied_trigger: &'a str,
}

/// Result of applying a change
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// State after the apply; `None` when the resource does not exist
    pub new_state: Option<ResourceState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyOutcome {
    fn ok(new_state: Option<ResourceState>) -> Self {
        Self {
            new_state,
            diagnostics: vec![],
        }
    }

    fn failed(new_state: Option<ResourceState>, operation: &str, err: &Error) -> Self {
        Self {
            new_state,
            diagnostics: vec![Diagnostic::from_error(operation, err)],
        }
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

/// Shellform provider
pub struct ShellformProvider {
    runner: Arc<dyn CommandRunner>,
    gate: Arc<ExecutionGate>,
    gate_scope: GateScope,
}

impl ShellformProvider {
    /// Provider using the configured shell and the process-wide gate
    pub fn new(config: &ShellformConfig) -> Self {
        Self::with_runner(
            Arc::new(ShellRunner::new(&config.shell.program)),
            ExecutionGate::global(),
            config.gate.scope,
        )
    }

    pub fn with_runner(
        runner: Arc<dyn CommandRunner>,
        gate: Arc<ExecutionGate>,
        gate_scope: GateScope,
    ) -> Self {
        Self {
            runner,
            gate,
            gate_scope,
        }
    }

    pub fn resource_schemas(&self) -> BTreeMap<&'static str, Schema> {
        [(SHELL_SCRIPT_TYPE, schema::shell_script_schema())]
            .into_iter()
            .collect()
    }

    fn resource(&self, type_name: &str, address: &str) -> Result<ShellScriptResource> {
        match type_name {
            SHELL_SCRIPT_TYPE => Ok(ShellScriptResource::new(
                self.runner.clone(),
                self.gate.clone(),
                gate_key(self.gate_scope, ShellScriptResource::type_name(), address),
            )),
            _ => Err(Error::InvalidConfig(format!(
                "Unknown resource type: {}",
                type_name
            ))),
        }
    }

    /// Validate a raw definition
    pub fn validate_resource_config(&self, type_name: &str, config: &DynamicValue) -> Vec<Diagnostic> {
        debug!("ValidateResourceConfig called for {}", type_name);

        let schemas = self.resource_schemas();
        let schema = match schemas.get(type_name) {
            Some(schema) => schema,
            None => {
                return vec![Diagnostic::error(
                    "Unknown resource type",
                    format!("This provider does not support {:?}", type_name),
                )]
            }
        };

        let mut diagnostics = schema.validate(config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(schema::validate_shell_script(config));
        }
        diagnostics
    }

    /// Validate a raw definition and convert it to a typed configuration
    pub fn decode_resource_config(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> std::result::Result<ResourceConfig, Vec<Diagnostic>> {
        let diagnostics = self.validate_resource_config(type_name, config);
        if has_errors(&diagnostics) {
            return Err(diagnostics);
        }
        for diagnostic in &diagnostics {
            warn!("{}: {}", diagnostic.summary, diagnostic.detail);
        }
        config_from_dynamic(config).map_err(|e| vec![Diagnostic::from_error("validation", &e)])
    }

    /// Refresh a resource. `None` means it no longer exists.
    pub async fn read_resource(
        &self,
        type_name: &str,
        address: &str,
        config: &ResourceConfig,
        state: &ResourceState,
    ) -> Result<Option<ResourceState>> {
        info!("ReadResource called for {}.{}", type_name, address);

        let resource = self.resource(type_name, address)?;
        let refreshed = resource.read(config, state).await?;
        Ok(refreshed.exists().then_some(refreshed))
    }

    /// Decide what applying `config` over `prior` will do
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<PriorResource<'_>>,
        config: Option<&ResourceConfig>,
    ) -> Result<PlannedChange> {
        debug!("PlanResourceChange called for {}", type_name);

        let schemas = self.resource_schemas();
        let schema = schemas
            .get(type_name)
            .ok_or_else(|| Error::InvalidConfig(format!("Unknown resource type: {}", type_name)))?;

        let prior = prior.filter(|p| p.state.exists());
        let change = match (prior, config) {
            (None, None) => PlannedChange::NoOp,
            (None, Some(_)) => PlannedChange::Create,
            (Some(_), None) => PlannedChange::Delete,
            (Some(prior), Some(config)) => {
                let changed = changed_attributes(prior.config, config)?;
                let replace: Vec<String> = schema
                    .force_new_attributes()
                    .filter(|a| changed.iter().any(|c| c == a.name))
                    .map(|a| a.name.to_string())
                    .collect();

                if !replace.is_empty() {
                    PlannedChange::Replace {
                        attributes: replace,
                    }
                } else if !changed.is_empty() {
                    PlannedChange::Update { reasons: changed }
                } else if prior.state.update_trigger != prior.applied_trigger {
                    debug!(
                        "update_trigger drifted from {:?} to {:?}",
                        prior.applied_trigger, prior.state.update_trigger
                    );
                    PlannedChange::Update {
                        reasons: vec!["update_trigger".to_string()],
                    }
                } else {
                    PlannedChange::NoOp
                }
            }
        };
        Ok(change)
    }

    /// Carry out a planned change
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        address: &str,
        change: &PlannedChange,
        prior: Option<PriorResource<'_>>,
        config: Option<&ResourceConfig>,
    ) -> ApplyOutcome {
        info!("ApplyResourceChange called for {}.{}", type_name, address);

        let resource = match self.resource(type_name, address) {
            Ok(resource) => resource,
            Err(e) => return ApplyOutcome::failed(prior.map(|p| p.state.clone()), "apply", &e),
        };
        let prior_state = prior.map(|p| p.state.clone());

        match (change, prior, config) {
            (PlannedChange::NoOp, _, _) => ApplyOutcome::ok(prior_state),

            (PlannedChange::Create, _, Some(config)) => match resource.create(config).await {
                Ok(state) => ApplyOutcome::ok(state.exists().then_some(state)),
                Err(e) => ApplyOutcome::failed(None, "create", &e),
            },

            (PlannedChange::Update { .. }, Some(prior), Some(config)) => {
                match resource.update(config, prior.state).await {
                    Ok(state) => ApplyOutcome::ok(state.exists().then_some(state)),
                    Err(e) => ApplyOutcome::failed(prior_state, "update", &e),
                }
            }

            (PlannedChange::Delete, Some(prior), _) => {
                match resource.delete(prior.config, prior.state).await {
                    Ok(_) => ApplyOutcome::ok(None),
                    Err(e) => ApplyOutcome::failed(prior_state, "delete", &e),
                }
            }

            (PlannedChange::Replace { .. }, Some(prior), Some(config)) => {
                if let Err(e) = resource.delete(prior.config, prior.state).await {
                    return ApplyOutcome::failed(prior_state, "delete", &e);
                }
                match resource.create(config).await {
                    Ok(state) => ApplyOutcome::ok(state.exists().then_some(state)),
                    Err(e) => ApplyOutcome::failed(None, "create", &e),
                }
            }

            (change, _, _) => ApplyOutcome {
                new_state: prior_state,
                diagnostics: vec![Diagnostic::error(
                    "Inconsistent plan",
                    format!("{:?} cannot be applied to {}.{} in its current state", change, type_name, address),
                )],
            },
        }
    }

    /// Adopt an existing resource by id and read its state
    pub async fn import_resource_state(
        &self,
        type_name: &str,
        address: &str,
        id: &str,
        config: &ResourceConfig,
    ) -> Result<ResourceState> {
        info!("ImportResourceState called for {} with ID {}", type_name, id);

        if id.is_empty() {
            return Err(Error::InvalidConfig("import requires a non-empty id".to_string()));
        }

        let initial_state = ResourceState::with_id(id);
        self.read_resource(type_name, address, config, &initial_state)
            .await?
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "{}.{} with id {} does not exist",
                    type_name, address, id
                ))
            })
    }
}

/// Names of configurable attributes that differ between two configurations
fn changed_attributes(prior: &ResourceConfig, next: &ResourceConfig) -> Result<Vec<String>> {
    let prior = serde_json::to_value(prior)?;
    let next = serde_json::to_value(next)?;

    let mut keys: Vec<&String> = prior
        .as_object()
        .into_iter()
        .chain(next.as_object())
        .flat_map(|map| map.keys())
        .collect();
    keys.sort();
    keys.dedup();

    Ok(keys
        .into_iter()
        .filter(|key| prior.get(key.as_str()) != next.get(key.as_str()))
        .cloned()
        .collect())
}
