//! Berth CLI
//!
//! Operator interface to the plugin lifecycle orchestrator. Every command
//! opens the configured ledger database, performs one operation and prints
//! the result as JSON on stdout. Logs go to stderr.
//!
//! ```bash
//! berth register ./crm.json
//! berth publish crm
//! berth install acme crm --config-json '{"region": "eu"}'
//! berth activate acme crm
//! BERTH_CONTAINER_BACKEND=noop berth status crm
//! ```

mod args;
mod commands;
mod logging;
mod router;

use clap::Parser;

pub use args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = router::load(&cli)?;
    logging::init(&config.logging);

    router::route(cli, &config).await
}
