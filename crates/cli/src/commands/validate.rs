//! Validate Command

use anyhow::{bail, Result};
use shellform_provider::diagnostics::has_errors;

use super::Context;
use crate::output::{print_diagnostics, print_success};
use crate::workspace::load_definitions;

/// Validate every definition and report all problems, not just the first
pub async fn execute(ctx: &Context) -> Result<()> {
    let definitions = load_definitions(&ctx.definitions_path)?;

    let mut invalid = 0;
    for (address, definition) in &definitions {
        let diagnostics = ctx
            .provider
            .validate_resource_config(&definition.type_name, &definition.body);
        print_diagnostics(address, &diagnostics);
        if has_errors(&diagnostics) {
            invalid += 1;
        }
    }

    if invalid > 0 {
        bail!("{} of {} definition(s) are invalid", invalid, definitions.len());
    }
    print_success(&format!("{} definition(s) are valid", definitions.len()));
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::testing::{context, write_definitions};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_valid_definitions() {
        let tmp = TempDir::new().unwrap();
        write_definitions(tmp.path(), "v1");
        execute(&context(tmp.path())).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_definitions() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("shellform.toml"),
            "[resources.a]\ncommand_create = \"true\"\n\n[resources.b]\nidempotent = \"yes\"\n",
        )
        .unwrap();
        assert!(execute(&context(tmp.path())).await.is_err());
    }
}
