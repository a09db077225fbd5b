use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ethgate_config::{ALLOW_UNPROTECTED_TXS_ENV, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "ethgate")]
#[command(about = "EVM transaction indexer and Ethereum JSON-RPC gateway")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a `.toml` or `.json` node configuration.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override `chain.chain_id`.
    #[arg(long, global = true)]
    pub chain_id: Option<u64>,

    /// Override `indexer.db_path` and switch to the sqlite backend.
    #[arg(long, value_name = "FILE", global = true)]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the node (the default).
    Run,
    /// Print the effective unprotected-transaction policy and exit.
    CheckFlags,
}

impl Cli {
    pub(crate) fn load_config(&self) -> eyre::Result<NodeConfig> {
        let mut config = NodeConfig::load(self.config.as_deref())?;
        config.apply_env();

        if let Some(chain_id) = self.chain_id {
            config.chain.chain_id = chain_id;
        }
        if let Some(ref db_path) = self.db_path {
            config.indexer.backend = ethgate_config::IndexerBackend::Sqlite;
            config.indexer.db_path = Some(db_path.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub(crate) fn run(self) -> eyre::Result<()> {
        match self.command {
            Some(Commands::CheckFlags) => self.check_flags(),
            Some(Commands::Run) | None => self.run_node(),
        }
    }

    fn check_flags(&self) -> eyre::Result<()> {
        let config = self.load_config()?;
        let source = match std::env::var(ALLOW_UNPROTECTED_TXS_ENV) {
            Ok(value) if ethgate_config::parse_flag(&value).is_some() => {
                format!("{ALLOW_UNPROTECTED_TXS_ENV}={value}")
            }
            _ if self.config.is_some() => "config file".to_string(),
            _ => "default".to_string(),
        };
        println!("allow_unprotected_txs = {} ({source})", config.rpc.allow_unprotected_txs);
        Ok(())
    }

    fn run_node(&self) -> eyre::Result<()> {
        let config = self.load_config()?;

        tracing::info!(
            chain_id = config.chain.chain_id,
            backend = ?config.indexer.backend,
            "Starting ethgate"
        );
        tracing::debug!(?config, "Full configuration");

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(crate::node::run(config))
    }
}
