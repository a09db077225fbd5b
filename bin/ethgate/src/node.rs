//! Wires the ledger, indexer and RPC server into a running node.

use std::{path::Path, sync::Arc};

use ethgate_config::{IndexerBackend, KeyringConfig, NodeConfig};
use ethgate_indexer::{
    EvmTxIndexer, IndexerError, IndexerService, MemoryTxIndex, SqliteTxIndex, verify_source,
};
use ethgate_ledger::{BlockProducer, Ledger, LedgerConfig};
use ethgate_rpc::{EthApiImpl, Keyring, NodeState, RpcServer, RpcServerConfig, Submitter};
use eyre::eyre;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run a node until interrupted or one of its tasks fails.
pub(crate) async fn run(config: NodeConfig) -> eyre::Result<()> {
    let chain = Arc::new(config.chain.to_chain_config());
    let devnet = &config.devnet;
    let ledger = Ledger::new(
        LedgerConfig::new(chain)
            .with_block_gas_limit(devnet.block_gas_limit)
            .with_max_block_txs(devnet.max_block_txs)
            .with_genesis(devnet.genesis_alloc()),
    )?;

    match config.indexer.backend {
        IndexerBackend::Memory => serve(config, ledger, MemoryTxIndex::new()).await,
        IndexerBackend::Sqlite => {
            let path = config
                .indexer
                .db_path
                .clone()
                .ok_or_else(|| eyre!("sqlite indexer requires indexer.db_path"))?;
            let index = open_sqlite_index(&path, &ledger)?;
            serve(config, ledger, index).await
        }
    }
}

/// Open the sqlite index at `path`, clearing it when it was built from a
/// different chain than `ledger`.
///
/// The ledger restarts from genesis, so records from an earlier run point at
/// blocks that no longer exist.
fn open_sqlite_index(path: &Path, ledger: &Ledger) -> eyre::Result<SqliteTxIndex> {
    info!(path = %path.display(), "Opening sqlite index");
    let index = SqliteTxIndex::open(path)?;
    match verify_source(&index, ledger) {
        Ok(()) => {}
        Err(IndexerError::SourceMismatch { height, reason }) => {
            warn!(
                path = %path.display(),
                height,
                %reason,
                "Index does not match ledger, clearing it"
            );
            index.clear()?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(index)
}

async fn serve<I: EvmTxIndexer + 'static>(
    config: NodeConfig,
    ledger: Ledger,
    index: I,
) -> eyre::Result<()> {
    let chain = Arc::clone(ledger.chain());
    let devnet = &config.devnet;

    let index = Arc::new(index);
    let (service, indexer) = IndexerService::new(Arc::clone(&index), config.indexer.queue_size)?;
    let caught_up = service.catch_up(&ledger)?;
    info!(caught_up, last_indexed = indexer.last_indexed(), "Indexer caught up");
    let indexer_task = service.spawn();

    let state = NodeState::new(chain.chain_id);
    state.set_latest_height(ledger.latest_height());
    state.set_indexed(indexer.last_indexed(), index.indexed_count()?);

    let keyring = load_keyring(&config.keyring)?;
    info!(accounts = keyring.len(), "Loaded keyring");

    let submitter = Submitter::new(Arc::clone(&chain))
        .with_broadcast(ledger.broadcast())
        .with_allow_unprotected_txs(config.rpc.allow_unprotected_txs);
    let eth = EthApiImpl::new(Arc::clone(&chain), Arc::clone(&index), ledger.clone())
        .with_submitter(submitter)
        .with_keyring(Arc::new(keyring))
        .with_node_state(state.clone());

    let server_config = RpcServerConfig::new(config.rpc.http_addr, config.rpc.jsonrpc_addr)
        .with_cors_origins(config.rpc.cors_origins.clone())
        .with_max_connections(config.rpc.max_connections);
    let server = RpcServer::new(server_config, state.clone(), eth).start().await?;
    info!(
        http = %server.http_addr(),
        jsonrpc = %server.jsonrpc_addr(),
        "RPC servers listening"
    );

    let producer = BlockProducer::new(ledger, indexer.clone())
        .with_block_time(devnet.block_time())
        .with_skip_empty(devnet.skip_empty_blocks)
        .with_node_state(state.clone())
        .spawn();
    let tracker = tokio::spawn(track_indexed(indexer.subscribe(), index, state));

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            signal.map_err(Into::into)
        }
        joined = indexer_task => match joined? {
            Ok(()) => Err(eyre!("indexer service stopped")),
            Err(e) => Err(e.into()),
        },
        joined = producer => match joined? {
            Ok(()) => Err(eyre!("block producer stopped")),
            Err(e) => Err(e.into()),
        },
    };

    tracker.abort();
    server.stop();
    result
}

fn load_keyring(config: &KeyringConfig) -> eyre::Result<Keyring> {
    let mut keyring = Keyring::from_hex_keys(&config.keys)?;
    if let Some(dir) = &config.key_dir {
        let loaded = keyring.load_dir(dir)?;
        debug!(loaded, dir = %dir.display(), "Loaded key directory");
    }
    Ok(keyring)
}

/// Mirror the indexer watermark into the node status.
async fn track_indexed<I: EvmTxIndexer>(
    mut watermark: watch::Receiver<i64>,
    index: Arc<I>,
    state: NodeState,
) {
    while watermark.changed().await.is_ok() {
        let last_indexed = *watermark.borrow_and_update();
        match index.indexed_count() {
            Ok(count) => state.set_indexed(last_indexed, count),
            Err(error) => warn!(%error, last_indexed, "Failed to read indexed count"),
        }
    }
}
