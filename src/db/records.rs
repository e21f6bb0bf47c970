//! Typed access to the serialized record tables.
//!
//! Callers open tables on their own read or write transaction and pass them
//! in, so one helper serves both sides of a unit of work.

use redb::{ReadTransaction, ReadableMultimapTable, ReadableTable, Table};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{decode, encode, tables};
use crate::error::Result;
use crate::models::{SavingRecord, TransactionRecord, UserRecord};

pub fn get_record<T, R>(table: &R, id: u64) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    table.get(id)?.map(|bytes| decode(bytes.value())).transpose()
}

pub fn put_record<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    record: &T,
) -> Result<()> {
    let bytes = encode(record)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

/// Look up a user, treating soft-deleted rows as absent
pub fn get_active_user<R>(users: &R, id: u64) -> Result<Option<UserRecord>>
where
    R: ReadableTable<u64, &'static [u8]>,
{
    Ok(get_record::<UserRecord, _>(users, id)?.filter(UserRecord::is_active))
}

/// Look up a saving, treating soft-deleted rows as absent
pub fn get_active_saving<R>(savings: &R, id: u64) -> Result<Option<SavingRecord>>
where
    R: ReadableTable<u64, &'static [u8]>,
{
    Ok(get_record::<SavingRecord, _>(savings, id)?.filter(SavingRecord::is_active))
}

/// Resolve a user through the unique email index
pub fn find_user_by_email(read_txn: &ReadTransaction, email: &str) -> Result<Option<UserRecord>> {
    let emails = read_txn.open_table(tables::USER_EMAILS)?;
    let Some(user_id) = emails.get(email)?.map(|id| id.value()) else {
        return Ok(None);
    };

    let users = read_txn.open_table(tables::USERS)?;
    get_active_user(&users, user_id)
}

/// All live savings of a user, ordered by id
pub fn list_user_savings(read_txn: &ReadTransaction, user_id: u64) -> Result<Vec<SavingRecord>> {
    let index = read_txn.open_multimap_table(tables::USER_SAVINGS)?;
    let savings = read_txn.open_table(tables::SAVINGS)?;

    let mut result = Vec::new();
    for saving_id in index.get(user_id)? {
        if let Some(saving) = get_active_saving(&savings, saving_id?.value())? {
            result.push(saving);
        }
    }
    Ok(result)
}

/// Ledger of a saving in insertion order
pub fn list_saving_transactions(
    read_txn: &ReadTransaction,
    saving_id: u64,
) -> Result<Vec<TransactionRecord>> {
    let index = read_txn.open_multimap_table(tables::SAVING_TRANSACTIONS)?;
    let transactions = read_txn.open_table(tables::TRANSACTIONS)?;

    let mut result = Vec::new();
    for transaction_id in index.get(saving_id)? {
        let record: Option<TransactionRecord> =
            get_record(&transactions, transaction_id?.value())?;
        if let Some(record) = record.filter(|t| t.deleted_at.is_none()) {
            result.push(record);
        }
    }
    Ok(result)
}
