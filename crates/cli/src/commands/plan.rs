//! Plan Command

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use serde::Serialize;
use shellform_provider::{PlannedChange, PriorResource};

use super::refresh::refresh_state;
use super::{Context, Desired};
use crate::output::{print_info, print_list, OutputFormat, TableDisplay};
use crate::workspace::{ResourceRecord, StateFile};

/// One planned change
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub address: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub change: PlannedChange,
}

impl PlanEntry {
    pub fn action(&self) -> &'static str {
        match self.change {
            PlannedChange::NoOp => "no-op",
            PlannedChange::Create => "create",
            PlannedChange::Update { .. } => "update",
            PlannedChange::Replace { .. } => "replace",
            PlannedChange::Delete => "delete",
        }
    }
}

impl TableDisplay for PlanEntry {
    fn headers() -> Vec<&'static str> {
        vec!["Address", "Type", "Action", "Because"]
    }

    fn row(&self) -> Vec<String> {
        let because = match &self.change {
            PlannedChange::Update { reasons } => reasons.join(", "),
            PlannedChange::Replace { attributes } => attributes.join(", "),
            _ => String::new(),
        };
        vec![
            self.address.clone(),
            self.type_name.clone(),
            self.action().to_string(),
            because,
        ]
    }
}

/// Prior view of a recorded resource
pub fn prior(record: &ResourceRecord) -> PriorResource<'_> {
    PriorResource {
        config: &record.config,
        state: &record.state,
        applied_trigger: &record.applied_trigger,
    }
}

/// Plan every address in either the definitions or the state
pub fn plan_changes(
    ctx: &Context,
    desired: &BTreeMap<String, Desired>,
    state: &StateFile,
) -> Result<Vec<PlanEntry>> {
    let addresses: BTreeSet<&String> = desired.keys().chain(state.resources.keys()).collect();

    let mut entries = Vec::with_capacity(addresses.len());
    for address in addresses {
        let wanted = desired.get(address);
        let record = state.resources.get(address);

        let type_name = match (wanted, record) {
            (Some(wanted), Some(record)) if wanted.type_name != record.type_name => bail!(
                "{} changed type from {} to {}; destroy it first",
                address,
                record.type_name,
                wanted.type_name
            ),
            (Some(wanted), _) => wanted.type_name.clone(),
            (None, Some(record)) => record.type_name.clone(),
            (None, None) => continue,
        };

        let change = ctx.provider.plan_resource_change(
            &type_name,
            record.map(prior),
            wanted.map(|w| &w.config),
        )?;
        entries.push(PlanEntry {
            address: address.clone(),
            type_name,
            change,
        });
    }
    Ok(entries)
}

/// Refresh state in place, then plan against the definitions
pub async fn refresh_and_plan(
    ctx: &Context,
    desired: &BTreeMap<String, Desired>,
    state: &mut StateFile,
) -> Result<Vec<PlanEntry>> {
    refresh_state(ctx, state).await?;
    plan_changes(ctx, desired, state)
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let desired = ctx.desired()?;
    let mut state = ctx.load_state()?;
    let entries = refresh_and_plan(ctx, &desired, &mut state).await?;

    let changes: Vec<PlanEntry> = entries.into_iter().filter(|e| !e.change.is_noop()).collect();
    if changes.is_empty() && ctx.format != OutputFormat::Json {
        print_info("No changes. Resources match the definitions.");
        return Ok(());
    }
    print_list(&changes, ctx.format);
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::testing::{context, write_definitions};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_plan_create_then_noop() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        let ctx = context(tmp.path());

        let mut state = ctx.load_state().unwrap();
        let entries = refresh_and_plan(&ctx, &ctx.desired().unwrap(), &mut state).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].change, PlannedChange::Create);

        crate::commands::apply::execute(&ctx).await.unwrap();
        let mut state = ctx.load_state().unwrap();
        let entries = refresh_and_plan(&ctx, &ctx.desired().unwrap(), &mut state).await.unwrap();
        assert!(entries[0].change.is_noop());
    }

    #[tokio::test]
    async fn test_plan_detects_drift_and_removal() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        let ctx = context(tmp.path());
        crate::commands::apply::execute(&ctx).await.unwrap();

        std::fs::write(tmp.path().join("thing.txt"), "edited").unwrap();
        let mut state = ctx.load_state().unwrap();
        let entries = refresh_and_plan(&ctx, &ctx.desired().unwrap(), &mut state).await.unwrap();
        assert_eq!(
            entries[0].change,
            PlannedChange::Update {
                reasons: vec!["update_trigger".to_string()]
            }
        );

        std::fs::write(tmp.path().join("shellform.toml"), "").unwrap();
        let entries = refresh_and_plan(&ctx, &ctx.desired().unwrap(), &mut state).await.unwrap();
        assert_eq!(entries[0].change, PlannedChange::Delete);
    }

    #[test]
    fn test_plan_entry_row() {
        let entry = PlanEntry {
            address: "web".to_string(),
            type_name: "shell_script".to_string(),
            change: PlannedChange::Replace {
                attributes: vec!["idempotent".to_string()],
            },
        };
        assert_eq!(entry.row()[2], "replace");
        assert_eq!(entry.row()[3], "idempotent");
    }
}
