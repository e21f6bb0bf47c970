//! Saving Ledger: the only code path that changes a saving's balance.
//!
//! A transaction row and the balance it implies are written inside one redb
//! write transaction. redb runs a single writer at a time, so the balance
//! read, the non-negative check and both writes form one serialized unit;
//! dropping the write transaction on any error discards all of it.

use chrono::Utc;
use redb::WriteTransaction;
use serde::Serialize;

use crate::constants::{
    ERR_BALANCE_OVERFLOW, ERR_DESCRIPTION_TOO_LONG, ERR_INVALID_TRANSACTION_VALUE,
};
use crate::db::{Db, next_id, records::put_record, tables};
use crate::error::{AppError, Result};
use crate::models::{SavingRecord, Transaction, TransactionKind, TransactionRecord};
use crate::ownership::load_owned_saving;

/// Outcome of an accepted transaction
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub transaction: Transaction,
    pub balance: i64,
}

/// Append a transaction to `saving` and move its balance accordingly
///
/// `saving` must have been read through `write_txn`, so the balance being
/// checked is the one that will be overwritten. `value` is the positive
/// amount; withdrawals are negated here. Nothing is written when the result
/// would be negative. The caller commits.
pub fn apply_transaction(
    write_txn: &WriteTransaction,
    saving: &mut SavingRecord,
    kind: TransactionKind,
    value: i64,
    description: Option<String>,
) -> Result<LedgerEntry> {
    if value <= 0 {
        return Err(AppError::validation(ERR_INVALID_TRANSACTION_VALUE));
    }
    let description = normalize_description(description)?;

    let signed_value = kind.signed(value);
    let new_balance = saving
        .balance
        .checked_add(signed_value)
        .ok_or_else(|| AppError::validation(ERR_BALANCE_OVERFLOW))?;

    tracing::debug!(
        "Saving {}: {} {} -> balance {} => {}",
        saving.id,
        kind,
        value,
        saving.balance,
        new_balance
    );

    if new_balance < 0 {
        tracing::warn!(
            "Rejected {} of {} on saving {}: balance {}",
            kind,
            value,
            saving.id,
            saving.balance
        );
        return Err(AppError::InsufficientFunds);
    }

    let now = Utc::now().timestamp();
    let record = TransactionRecord {
        id: next_id(write_txn, tables::TRANSACTION_SEQUENCE)?,
        saving_id: saving.id,
        kind,
        value: signed_value,
        description,
        created_at: now,
        deleted_at: None,
    };

    {
        let mut transactions = write_txn.open_table(tables::TRANSACTIONS)?;
        put_record(&mut transactions, record.id, &record)?;

        let mut ledger_index = write_txn.open_multimap_table(tables::SAVING_TRANSACTIONS)?;
        ledger_index.insert(saving.id, record.id)?;
    }

    let updated = SavingRecord {
        balance: new_balance,
        updated_at: now,
        ..saving.clone()
    };
    {
        let mut savings = write_txn.open_table(tables::SAVINGS)?;
        put_record(&mut savings, updated.id, &updated)?;
    }
    *saving = updated;

    Ok(LedgerEntry {
        transaction: Transaction::from(&record),
        balance: new_balance,
    })
}

/// Authorize and apply one transaction as a complete unit of work
///
/// `guard` sees the saving as loaded by this write transaction, after the
/// ownership check, so whatever it verifies still holds when the balance
/// moves.
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn record_transaction<G>(
    db: &Db,
    acting_user_id: Option<u64>,
    saving_id: u64,
    kind: TransactionKind,
    value: i64,
    description: Option<String>,
    guard: G,
) -> Result<LedgerEntry>
where
    G: FnOnce(&SavingRecord) -> Result<()>,
{
    let write_txn = db.begin_write()?;

    let mut saving = {
        let savings = write_txn.open_table(tables::SAVINGS)?;
        load_owned_saving(&savings, acting_user_id, saving_id)?
    };
    guard(&saving)?;
    let entry = apply_transaction(&write_txn, &mut saving, kind, value, description)?;

    write_txn.commit()?;

    tracing::info!(
        "Transaction {} recorded on saving {}: {} {}, balance {}",
        entry.transaction.id,
        saving_id,
        kind,
        value,
        entry.balance
    );

    Ok(entry)
}

/// Blank descriptions are stored as absent
fn normalize_description(description: Option<String>) -> Result<Option<String>> {
    let Some(description) = description else {
        return Ok(None);
    };
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !Transaction::validate_description(trimmed) {
        return Err(AppError::validation(ERR_DESCRIPTION_TOO_LONG));
    }
    Ok(Some(trimmed.to_string()))
}
