//! Apply Command

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use shellform_common::ResourceConfig;
use tracing::warn;

use super::plan::{prior, refresh_and_plan, PlanEntry};
use super::{Context, Desired};
use crate::output::{print_diagnostics, print_info, print_list, print_success};
use crate::workspace::{ResourceRecord, StateFile};

/// Apply one planned change and record the result. Returns false on error.
async fn apply_entry(
    ctx: &Context,
    entry: &PlanEntry,
    config: Option<&ResourceConfig>,
    state: &mut StateFile,
) -> bool {
    let recorded = state.resources.get(&entry.address).cloned();
    let outcome = ctx
        .provider
        .apply_resource_change(
            &entry.type_name,
            &entry.address,
            &entry.change,
            recorded.as_ref().map(prior),
            config,
        )
        .await;

    print_diagnostics(&entry.address, &outcome.diagnostics);
    let failed = outcome.has_errors();

    match (outcome.new_state, config) {
        // A failed change that left the resource in place keeps its old record
        (Some(_), _) if failed => {}
        (Some(new_state), Some(config)) => {
            state.resources.insert(
                entry.address.clone(),
                ResourceRecord::new(&entry.type_name, config.clone(), new_state),
            );
        }
        (Some(_), None) => {
            warn!("{} returned state without a configuration", entry.address);
        }
        (None, _) => {
            state.resources.remove(&entry.address);
        }
    }

    !failed
}

/// Apply every change in `entries`, saving state after each
pub async fn apply_plan(
    ctx: &Context,
    entries: &[PlanEntry],
    desired: &BTreeMap<String, Desired>,
    state: &mut StateFile,
) -> Result<usize> {
    let mut failures = 0;
    for entry in entries.iter().filter(|e| !e.change.is_noop()) {
        let config = desired.get(&entry.address).map(|d| &d.config);
        if apply_entry(ctx, entry, config, state).await {
            print_success(&format!("{}: {} complete", entry.address, entry.action()));
        } else {
            failures += 1;
        }
        ctx.save_state(state)?;
    }
    Ok(failures)
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let desired = ctx.desired()?;
    let mut state = ctx.load_state()?;
    let entries = refresh_and_plan(ctx, &desired, &mut state).await?;
    ctx.save_state(&state)?;

    let changes: Vec<PlanEntry> = entries.into_iter().filter(|e| !e.change.is_noop()).collect();
    if changes.is_empty() {
        print_info("No changes. Resources match the definitions.");
        return Ok(());
    }
    print_list(&changes, ctx.format);

    let failures = apply_plan(ctx, &changes, &desired, &mut state).await?;
    if failures > 0 {
        bail!("{} of {} change(s) failed", failures, changes.len());
    }
    print_success(&format!("Applied {} change(s)", changes.len()));
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::testing::{context, write_definitions};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_apply_creates_and_updates() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        let ctx = context(tmp.path());

        execute(&ctx).await.unwrap();
        let state = ctx.load_state().unwrap();
        let record = &state.resources["thing"];
        assert_eq!(record.state.update_trigger, "v1");
        assert_eq!(record.applied_trigger, "v1");
        let id = record.state.id.clone();

        write_definitions(tmp.path(), "v2");
        execute(&ctx).await.unwrap();
        let state = ctx.load_state().unwrap();
        let record = &state.resources["thing"];
        assert_eq!(record.state.id, id);
        assert_eq!(record.applied_trigger, "v2");
        assert_eq!(record.config.environment["CONTENT"], "v2");
        assert_eq!(std::fs::read_to_string(tmp.path().join("thing.txt")).unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_apply_repairs_drift() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        let ctx = context(tmp.path());
        execute(&ctx).await.unwrap();

        std::fs::write(tmp.path().join("thing.txt"), "edited").unwrap();
        execute(&ctx).await.unwrap();

        assert_eq!(std::fs::read_to_string(tmp.path().join("thing.txt")).unwrap(), "v1");
        let state = ctx.load_state().unwrap();
        assert_eq!(state.resources["thing"].applied_trigger, "v1");
    }

    #[tokio::test]
    async fn test_failed_create_is_not_recorded() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("shellform.toml"),
            "[resources.broken]\ncommand_create = \"exit 4\"\ncommand_delete = \"true\"\n",
        )
        .unwrap();
        let ctx = context(tmp.path());

        assert!(execute(&ctx).await.is_err());
        assert!(ctx.load_state().unwrap().resources.is_empty());
    }
}
