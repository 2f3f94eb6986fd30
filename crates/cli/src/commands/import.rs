//! Import Command

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;

use super::Context;
use crate::output::print_success;
use crate::workspace::ResourceRecord;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Address of a resource in the definitions file
    pub address: String,

    /// ID of the existing resource
    pub id: String,
}

pub async fn execute(args: ImportArgs, ctx: &Context) -> Result<()> {
    let mut state = ctx.load_state()?;
    if state.resources.contains_key(&args.address) {
        bail!("{} is already managed; remove it from state first", args.address);
    }

    let mut desired = ctx.desired()?;
    let wanted = desired.remove(&args.address).ok_or_else(|| {
        anyhow!(
            "{} is not defined in {}",
            args.address,
            ctx.definitions_path.display()
        )
    })?;

    let imported = ctx
        .provider
        .import_resource_state(&wanted.type_name, &args.address, &args.id, &wanted.config)
        .await
        .with_context(|| format!("Failed to import {}", args.address))?;

    state.resources.insert(
        args.address.clone(),
        ResourceRecord::new(wanted.type_name, wanted.config, imported),
    );
    ctx.save_state(&state)?;

    print_success(&format!("Imported {} with ID {}", args.address, args.id));
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::testing::{context, write_definitions};
    use tempfile::TempDir;

    fn args(id: &str) -> ImportArgs {
        ImportArgs {
            address: "thing".to_string(),
            id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_import_existing_resource() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        std::fs::write(tmp.path().join("thing.txt"), "already-here").unwrap();
        let ctx = context(tmp.path());

        execute(args("external"), &ctx).await.unwrap();
        let state = ctx.load_state().unwrap();
        let record = &state.resources["thing"];
        assert_eq!(record.state.id, "external");
        assert_eq!(record.state.update_trigger, "already-here");
        assert_eq!(record.applied_trigger, "already-here");

        // Importing twice is refused
        assert!(execute(args("external"), &ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_import_missing_resource_fails() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        let ctx = context(tmp.path());

        assert!(execute(args("nothing"), &ctx).await.is_err());
        assert!(ctx.load_state().unwrap().resources.is_empty());
    }
}
