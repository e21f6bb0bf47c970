//! Ownership Guard: only the owning user may mutate a saving.

use redb::ReadableTable;

use crate::constants::{ERR_NOT_SAVING_OWNER, ERR_SAVING_NOT_FOUND};
use crate::db::records::get_active_saving;
use crate::error::{AppError, Result};
use crate::models::SavingRecord;

/// Plain identity comparison, no roles or hierarchy
pub fn authorize(acting_user_id: u64, saving: &SavingRecord) -> bool {
    acting_user_id == saving.user_id
}

/// Fail closed: a missing acting identity is never an owner
pub fn ensure_owner(acting_user_id: Option<u64>, saving: &SavingRecord) -> Result<()> {
    match acting_user_id {
        Some(user_id) if authorize(user_id, saving) => Ok(()),
        _ => {
            tracing::warn!(
                "Ownership check failed for saving {} (acting user {:?})",
                saving.id,
                acting_user_id
            );
            Err(AppError::Forbidden(ERR_NOT_SAVING_OWNER))
        }
    }
}

/// Resolve a saving and check ownership, in that order
///
/// A missing or soft-deleted saving is `NotFound` for everyone; an existing
/// saving of another user is `Forbidden` and reveals nothing else.
pub fn load_owned_saving<R>(
    savings: &R,
    acting_user_id: Option<u64>,
    saving_id: u64,
) -> Result<SavingRecord>
where
    R: ReadableTable<u64, &'static [u8]>,
{
    let saving =
        get_active_saving(savings, saving_id)?.ok_or(AppError::NotFound(ERR_SAVING_NOT_FOUND))?;
    ensure_owner(acting_user_id, &saving)?;
    Ok(saving)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_in_memory, records::put_record, tables};

    fn saving_of(user_id: u64) -> SavingRecord {
        SavingRecord::new(1, user_id, "Car".to_string(), "digest".to_string(), 0)
    }

    #[test]
    fn test_owner_is_authorized() {
        assert!(authorize(7, &saving_of(7)));
        assert!(ensure_owner(Some(7), &saving_of(7)).is_ok());
    }

    #[test]
    fn test_other_user_is_forbidden() {
        assert!(!authorize(8, &saving_of(7)));
        assert!(matches!(
            ensure_owner(Some(8), &saving_of(7)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_missing_identity_is_forbidden() {
        assert!(matches!(
            ensure_owner(None, &saving_of(7)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_existence_checked_before_ownership() {
        let db = open_in_memory().unwrap();
        let write_txn = db.begin_write().unwrap();
        {
            let mut savings = write_txn.open_table(tables::SAVINGS).unwrap();
            put_record(&mut savings, 1, &saving_of(7)).unwrap();

            let mut deleted = SavingRecord::new(2, 7, "Old".to_string(), "d".to_string(), 0);
            deleted.deleted_at = Some(1);
            put_record(&mut savings, 2, &deleted).unwrap();
        }
        write_txn.commit().unwrap();

        let read_txn = db.begin_read().unwrap();
        let savings = read_txn.open_table(tables::SAVINGS).unwrap();

        assert_eq!(load_owned_saving(&savings, Some(7), 1).unwrap().id, 1);
        assert!(matches!(
            load_owned_saving(&savings, Some(8), 1),
            Err(AppError::Forbidden(_))
        ));
        // Unknown ids are NotFound even for a non-owner
        assert!(matches!(
            load_owned_saving(&savings, Some(8), 99),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            load_owned_saving(&savings, Some(7), 2),
            Err(AppError::NotFound(_))
        ));
    }
}
