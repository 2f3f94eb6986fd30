//! Shellform CLI - Main Entry Point
//!
//! Validates, plans, and applies `shell_script` resources defined in a
//! TOML (or JSON) file, keeping their state in a local JSON file.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use shellform_common::{default_config_path, default_definitions_path, ShellformConfig, VERSION};
use shellform_provider::ShellformProvider;
use tracing::debug;

use shellform_cli::commands::{apply, destroy, import, plan, refresh, show, validate, Context};
use shellform_cli::output;

/// Shellform - resources managed by shell commands
#[derive(Parser)]
#[command(name = "shellform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "SHELLFORM_CONFIG", default_value_os_t = default_config_path(), global = true)]
    config: PathBuf,

    /// Resource definitions file
    #[arg(short, long, default_value_os_t = default_definitions_path(), global = true)]
    file: PathBuf,

    /// State file, overriding the configured path
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate resource definitions
    Validate,

    /// Refresh state and show planned changes
    Plan,

    /// Refresh, plan, and apply changes
    Apply,

    /// Refresh state from the read commands
    Refresh,

    /// Delete every resource in state
    Destroy,

    /// Show resources in state
    Show,

    /// Adopt an existing resource
    Import(import::ImportArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ShellformConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { config.log.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!("Loaded configuration: {:?}", config);

    let state_path = cli.state.unwrap_or_else(|| config.state_path.clone());
    let ctx = Context::new(
        ShellformProvider::new(&config),
        cli.file,
        state_path,
        cli.format,
    );

    match cli.command {
        Commands::Validate => validate::execute(&ctx).await?,
        Commands::Plan => plan::execute(&ctx).await?,
        Commands::Apply => apply::execute(&ctx).await?,
        Commands::Refresh => refresh::execute(&ctx).await?,
        Commands::Destroy => destroy::execute(&ctx).await?,
        Commands::Show => show::execute(&ctx).await?,
        Commands::Import(args) => import::execute(args, &ctx).await?,
        Commands::Version => {
            println!("Shellform v{}", VERSION);
            println!("Resource types: {}", resource_types(&ctx));
        }
    }

    Ok(())
}

fn resource_types(ctx: &Context) -> String {
    ctx.provider
        .resource_schemas()
        .keys()
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}
