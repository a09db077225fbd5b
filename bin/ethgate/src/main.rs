//! ethgate - an EVM transaction indexer and Ethereum JSON-RPC gateway for a
//! mixed native/EVM chain.

use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

mod cli;
mod node;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli.run()
}
