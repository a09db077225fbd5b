//! SQLite-backed transaction index.
//!
//! Reads go through an r2d2 pool of read-only connections while a single
//! dedicated connection serializes writes. WAL mode lets readers proceed
//! against the last committed snapshot while a block is being written.

use std::{
    path::Path,
    sync::atomic::{AtomicI64, Ordering},
};

use alloy_primitives::B256;
use ethgate_domain::{Block, DeliveryOutcome};
use parking_lot::Mutex;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags, OptionalExtension as _, Transaction, params};
use tempfile::TempDir;

use crate::{EvmTxIndexer, IndexedTx, IndexerError, TxResult, extract};

const LAST_INDEXED_KEY: &str = "last_indexed";

const TX_RESULT_COLUMNS: &str =
    "height, tx_index, msg_index, eth_tx_index, failed, gas_used, cumulative_gas_used";

/// Persistent [`EvmTxIndexer`] backed by SQLite.
pub struct SqliteTxIndex {
    read_pool: Pool<SqliteConnectionManager>,
    writer: Mutex<Connection>,
    last_indexed: AtomicI64,
    // Dropped after the connections above.
    scratch_dir: Option<TempDir>,
}

impl std::fmt::Debug for SqliteTxIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTxIndex")
            .field("last_indexed", &self.last_indexed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn configure_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;",
    )
}

impl SqliteTxIndex {
    /// Open (or create) an index stored at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, IndexerError> {
        let writer = Connection::open(&db_path)?;
        configure_connection(&writer)?;
        init_schema(&writer)?;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder().max_size(4).build(manager)?;

        Self::from_parts(read_pool, writer)
    }

    /// Create an index in a fresh temporary directory, removed on drop.
    ///
    /// The database is file-backed so readers keep their own WAL snapshot
    /// while a block is being written.
    pub fn temporary() -> Result<Self, IndexerError> {
        let dir = tempfile::Builder::new()
            .prefix("ethgate-index")
            .tempdir()
            .map_err(|e| IndexerError::StorageUnavailable(e.to_string()))?;
        let mut index = Self::open(dir.path().join("index.db"))?;
        index.scratch_dir = Some(dir);
        Ok(index)
    }

    fn from_parts(
        read_pool: Pool<SqliteConnectionManager>,
        writer: Connection,
    ) -> Result<Self, IndexerError> {
        let index = Self {
            read_pool,
            writer: Mutex::new(writer),
            last_indexed: AtomicI64::new(-1),
            scratch_dir: None,
        };
        index.initialize()?;
        Ok(index)
    }

    /// Remove every record and reset the watermark to `-1`.
    pub fn clear(&self) -> Result<(), IndexerError> {
        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM tx_results;
             DELETE FROM blocks;
             DELETE FROM metadata;",
        )?;
        tx.commit()?;
        self.last_indexed.store(-1, Ordering::Release);
        tracing::info!("sqlite tx index cleared");
        Ok(())
    }

    /// Load the persisted watermark into the cache.
    fn initialize(&self) -> Result<(), IndexerError> {
        let conn = self.read_conn()?;
        let last: Option<i64> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?",
                params![LAST_INDEXED_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match last {
            Some(height) => {
                self.last_indexed.store(height, Ordering::Release);
                tracing::info!(height, "sqlite tx index initialized");
            }
            None => tracing::info!("sqlite tx index initialized (empty)"),
        }
        Ok(())
    }

    fn read_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, IndexerError> {
        Ok(self.read_pool.get()?)
    }

    fn query_one(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<TxResult>, IndexerError> {
        let conn = self.read_conn()?;
        match conn.query_row(sql, params, row_to_tx_result) {
            Ok(result) => Ok(Some(result)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tx_results (
             hash BLOB PRIMARY KEY,
             height INTEGER NOT NULL,
             tx_index INTEGER NOT NULL,
             msg_index INTEGER NOT NULL,
             eth_tx_index INTEGER NOT NULL,
             failed INTEGER NOT NULL,
             gas_used INTEGER NOT NULL,
             cumulative_gas_used INTEGER NOT NULL
         );
         CREATE UNIQUE INDEX IF NOT EXISTS idx_tx_results_block
             ON tx_results(height, eth_tx_index);

         CREATE TABLE IF NOT EXISTS blocks (
             height INTEGER PRIMARY KEY,
             hash BLOB NOT NULL
         );

         CREATE TABLE IF NOT EXISTS metadata (
             key TEXT PRIMARY KEY,
             value INTEGER NOT NULL
         );",
    )
}

/// Fail if any of `indexed` is already stored at a height other than `height`.
fn check_unmoved(
    tx: &Transaction<'_>,
    height: i64,
    indexed: &[IndexedTx],
) -> Result<(), IndexerError> {
    let mut lookup = tx.prepare("SELECT height FROM tx_results WHERE hash = ? AND height <> ?")?;
    for item in indexed {
        let existing: Option<i64> =
            lookup.query_row(params![item.hash.as_slice(), height], |row| row.get(0)).optional()?;
        if let Some(existing) = existing {
            return Err(IndexerError::integrity(
                height as u64,
                item.result.tx_index as usize,
                format!("transaction {} already indexed at height {existing}", item.hash),
            ));
        }
    }
    Ok(())
}

fn row_to_tx_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<TxResult> {
    let height: i64 = row.get(0)?;
    let tx_index: i64 = row.get(1)?;
    let msg_index: i64 = row.get(2)?;
    let eth_tx_index: i64 = row.get(3)?;
    let failed: bool = row.get(4)?;
    let gas_used: i64 = row.get(5)?;
    let cumulative_gas_used: i64 = row.get(6)?;
    Ok(TxResult {
        height,
        tx_index: tx_index as u32,
        msg_index: msg_index as u32,
        eth_tx_index: eth_tx_index as i32,
        failed,
        gas_used: gas_used as u64,
        cumulative_gas_used: cumulative_gas_used as u64,
    })
}

impl EvmTxIndexer for SqliteTxIndex {
    fn last_indexed_block(&self) -> Result<i64, IndexerError> {
        Ok(self.last_indexed.load(Ordering::Acquire))
    }

    fn index_block(
        &self,
        block: &Block,
        outcomes: &[DeliveryOutcome],
    ) -> Result<(), IndexerError> {
        let indexed = extract(block, outcomes)?;
        let height = block.height() as i64;

        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;

        check_unmoved(&tx, height, &indexed)?;
        tx.execute("DELETE FROM tx_results WHERE height = ?", params![height])?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO tx_results (hash, {TX_RESULT_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
            ))?;
            for item in &indexed {
                let r = &item.result;
                insert.execute(params![
                    item.hash.as_slice(),
                    r.height,
                    r.tx_index as i64,
                    r.msg_index as i64,
                    r.eth_tx_index as i64,
                    r.failed,
                    r.gas_used as i64,
                    r.cumulative_gas_used as i64,
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO blocks (height, hash) VALUES (?, ?)",
            params![height, block.hash().as_slice()],
        )?;
        tx.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
            params![LAST_INDEXED_KEY, height],
        )?;
        tx.commit()?;

        self.last_indexed.fetch_max(height, Ordering::AcqRel);
        tracing::debug!(height, txs = indexed.len(), hash = %block.hash(), "indexed block");
        Ok(())
    }

    fn get_by_tx_hash(&self, hash: B256) -> Result<Option<TxResult>, IndexerError> {
        self.query_one(
            &format!("SELECT {TX_RESULT_COLUMNS} FROM tx_results WHERE hash = ?"),
            params![hash.as_slice()],
        )
    }

    fn get_by_block_and_index(
        &self,
        height: i64,
        eth_tx_index: i32,
    ) -> Result<Option<TxResult>, IndexerError> {
        self.query_one(
            &format!(
                "SELECT {TX_RESULT_COLUMNS} FROM tx_results WHERE height = ? AND eth_tx_index = ?"
            ),
            params![height, eth_tx_index as i64],
        )
    }

    fn indexed_count(&self) -> Result<u64, IndexerError> {
        let conn = self.read_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tx_results", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn indexed_block_hash(&self, height: u64) -> Result<Option<B256>, IndexerError> {
        let conn = self.read_conn()?;
        let hash: Option<Vec<u8>> = conn
            .query_row("SELECT hash FROM blocks WHERE height = ?", params![height as i64], |row| {
                row.get(0)
            })
            .optional()?;
        hash.map(|bytes| {
            B256::try_from(bytes.as_slice()).map_err(|_| {
                IndexerError::integrity(height, 0, "stored block hash is not 32 bytes")
            })
        })
        .transpose()
    }
}
