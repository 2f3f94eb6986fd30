//! Destroy Command

use anyhow::{bail, Result};
use shellform_provider::PlannedChange;

use super::apply::apply_plan;
use super::plan::PlanEntry;
use super::Context;
use crate::output::{print_info, print_success};

pub async fn execute(ctx: &Context) -> Result<()> {
    let mut state = ctx.load_state()?;
    if state.resources.is_empty() {
        print_info("Nothing to destroy.");
        return Ok(());
    }

    let entries: Vec<PlanEntry> = state
        .resources
        .iter()
        .map(|(address, record)| PlanEntry {
            address: address.clone(),
            type_name: record.type_name.clone(),
            change: PlannedChange::Delete,
        })
        .collect();

    let failures = apply_plan(ctx, &entries, &Default::default(), &mut state).await?;
    if failures > 0 {
        bail!("{} of {} resource(s) could not be destroyed", failures, entries.len());
    }
    print_success(&format!("Destroyed {} resource(s)", entries.len()));
    Ok(())
}
