//! Refresh Command

use anyhow::{Context as _, Result};
use tracing::info;

use super::Context;
use crate::output::{print_info, print_list, print_success};
use crate::workspace::StateFile;
use super::show::ResourceRow;

/// Run Read for every resource in state. Resources that no longer exist
/// are dropped; returns their addresses.
pub async fn refresh_state(ctx: &Context, state: &mut StateFile) -> Result<Vec<String>> {
    let mut gone = Vec::new();

    for (address, record) in state.resources.iter_mut() {
        let refreshed = ctx
            .provider
            .read_resource(&record.type_name, address, &record.config, &record.state)
            .await
            .with_context(|| format!("Failed to refresh {}", address))?;

        match refreshed {
            Some(refreshed) => record.state = refreshed,
            None => {
                info!("{} no longer exists", address);
                gone.push(address.clone());
            }
        }
    }

    for address in &gone {
        state.resources.remove(address);
    }
    Ok(gone)
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let mut state = ctx.load_state()?;
    let gone = refresh_state(ctx, &mut state).await?;
    ctx.save_state(&state)?;

    for address in &gone {
        print_info(&format!("{} no longer exists and was removed from state", address));
    }
    let rows: Vec<ResourceRow> = state.resources.iter().map(ResourceRow::from).collect();
    print_list(&rows, ctx.format);
    print_success(&format!("Refreshed {} resource(s)", rows.len()));
    Ok(())
}
