//! Command routing logic for CLI

use std::path::{Path, PathBuf};

use anyhow::Result;
use berth_core::{BerthConfig, Orchestrator, load_config};

use crate::args::{Cli, Commands, DEFAULT_CONFIG_FILE};
use crate::commands::{plugin, print_json, tenant};

/// Explicit `--config`, else `<user config dir>/berth/berth.toml` when present
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    dirs::config_dir()
        .map(|dir| dir.join("berth").join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Load the configuration the CLI runs with
pub fn load(cli: &Cli) -> Result<BerthConfig> {
    let path = config_path(cli.config.as_deref());
    Ok(load_config(path.as_deref())?)
}

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: &BerthConfig) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    tracing::debug!(
        backend = orchestrator.container_backend(),
        database = %config.database.path.display(),
        "Orchestrator ready"
    );

    let pretty = cli.pretty;
    match &cli.command {
        Commands::Register { manifest } => {
            print_json(&plugin::register(&orchestrator, manifest).await?, pretty)
        }
        Commands::Publish { plugin: id } => print_json(&plugin::publish(&orchestrator, id)?, pretty),
        Commands::Install {
            target,
            configuration,
        } => print_json(
            &tenant::install(&orchestrator, target, configuration.as_deref()).await?,
            pretty,
        ),
        Commands::Activate { target } => {
            print_json(&tenant::activate(&orchestrator, target).await?, pretty)
        }
        Commands::Deactivate { target } => {
            print_json(&tenant::deactivate(&orchestrator, target).await?, pretty)
        }
        Commands::Uninstall { target } => {
            print_json(&tenant::uninstall(&orchestrator, target).await?, pretty)
        }
        Commands::Enable { target } => {
            print_json(&tenant::enable(&orchestrator, target).await?, pretty)
        }
        Commands::Disable { target } => {
            print_json(&tenant::disable(&orchestrator, target).await?, pretty)
        }
        Commands::List { tenant: id } => print_json(&tenant::list(&orchestrator, id)?, pretty),
        Commands::Status { plugin: id } => {
            print_json(&plugin::status(&orchestrator, id).await?, pretty)
        }
        Commands::Recover { plugin: id } => {
            print_json(&plugin::recover(&orchestrator, id).await?, pretty)
        }
    }
}
