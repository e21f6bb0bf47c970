pub mod records;
pub mod tables;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
pub fn open_database(path: impl AsRef<Path>) -> Result<Db> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            tracing::error!("Failed to create database directory: {}", e);
            redb::StorageError::Io(e)
        })?;
    }

    let db = Database::create(path)?;
    init_tables(&db)?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Open a database that lives only in memory
pub fn open_in_memory() -> Result<Db> {
    let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
    init_tables(&db)?;
    Ok(Arc::new(db))
}

fn init_tables(db: &Database) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        // Create tables if they don't exist by opening them
        let _ = write_txn.open_table(tables::USERS)?;
        let _ = write_txn.open_table(tables::USER_EMAILS)?;
        let _ = write_txn.open_table(tables::SAVINGS)?;
        let _ = write_txn.open_multimap_table(tables::USER_SAVINGS)?;
        let _ = write_txn.open_table(tables::TRANSACTIONS)?;
        let _ = write_txn.open_multimap_table(tables::SAVING_TRANSACTIONS)?;
        let _ = write_txn.open_table(tables::SEQUENCES)?;
        let _ = write_txn.open_table(tables::PIN_ATTEMPTS)?;
        let _ = write_txn.open_multimap_table(tables::PIN_ATTEMPT_EXPIRY)?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
    Ok(value)
}

/// Issue the next id of a named sequence inside the caller's write transaction
///
/// Ids start at 1. An id issued by a transaction that is rolled back is
/// handed out again by the next one.
pub fn next_id(write_txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut table = write_txn.open_table(tables::SEQUENCES)?;
    let next = table.get(sequence)?.map(|last| last.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}
