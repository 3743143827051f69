//! CLI argument definitions using clap
//!
//! - berth register <manifest.json>
//! - berth publish <plugin>
//! - berth install <tenant> <plugin> [--config JSON]
//! - berth activate|deactivate|uninstall|enable|disable <tenant> <plugin>
//! - berth list <tenant>
//! - berth status <plugin>
//! - berth recover <plugin>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name looked up in the user config directory.
pub const DEFAULT_CONFIG_FILE: &str = "berth.toml";

#[derive(Parser, Debug)]
#[command(name = "berth")]
#[command(about = "Berth - multi-tenant plugin lifecycle orchestrator")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true, env = "BERTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Tenant and plugin addressed by a ledger command
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Tenant id
    pub tenant: String,
    /// Plugin id
    pub plugin: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a plugin from a manifest file
    Register {
        /// Manifest document (JSON)
        manifest: PathBuf,
    },

    /// Mark a plugin as published in the marketplace
    Publish {
        /// Plugin id
        plugin: String,
    },

    /// Install a plugin for a tenant
    Install {
        #[command(flatten)]
        target: Target,

        /// Tenant configuration (JSON object)
        #[arg(long = "config-json", value_name = "JSON")]
        configuration: Option<String>,
    },

    /// Activate a plugin for a tenant, starting its container if needed
    Activate {
        #[command(flatten)]
        target: Target,
    },

    /// Deactivate a plugin for a tenant, stopping its container for the last tenant
    Deactivate {
        #[command(flatten)]
        target: Target,
    },

    /// Uninstall a plugin for a tenant
    Uninstall {
        #[command(flatten)]
        target: Target,
    },

    /// Enable an already active plugin for a tenant
    Enable {
        #[command(flatten)]
        target: Target,
    },

    /// Disable a plugin for a tenant without stopping its container
    Disable {
        #[command(flatten)]
        target: Target,
    },

    /// List a tenant's installed plugins
    List {
        /// Tenant id
        tenant: String,
    },

    /// Show a plugin's lifecycle status and container health
    Status {
        /// Plugin id
        plugin: String,
    },

    /// Return a retired plugin to REGISTERED
    Recover {
        /// Plugin id
        plugin: String,
    },
}
