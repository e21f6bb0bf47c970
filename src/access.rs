//! Saving Access Session: PIN login producing a per-saving access marker.
//!
//! A marker has the form `<saving_id>.<expires_at>.<signature>` where the
//! signature is an HMAC-SHA256, keyed by the server's saving key secret, over
//! the saving id, the expiry and a SHA-256 fingerprint of the current PIN
//! digest. Markers carry neither the PIN nor its digest, cannot be moved to
//! another saving, expire on their own and stop verifying once the PIN
//! changes.

use chrono::Utc;
use redb::{ReadableMultimapTable, WriteTransaction};
use serde::Serialize;

use crate::config::Config;
use crate::constants::ERR_INVALID_PIN;
use crate::db::{
    Db,
    records::{get_active_saving, get_record, put_record},
    tables,
};
use crate::error::{AppError, Result};
use crate::models::{PinAttemptRecord, Saving, SavingRecord};
use crate::security::{CredentialVerifier, fingerprint, sign_hmac, verify_hmac};

const ERR_MISSING_MARKER: &str = "Saving access key is required";
const ERR_INVALID_MARKER: &str = "Saving access key is invalid or expired";

/// Result of a successful saving login
#[derive(Debug, Clone, Serialize)]
pub struct SavingAccess {
    pub saving_id: u64,
    pub key: String,
    pub expires_at: i64,
}

fn marker_payload(saving_id: u64, expires_at: i64, pin_hash: &str) -> String {
    format!("{}|{}|{}", saving_id, expires_at, fingerprint(pin_hash))
}

/// Sign a marker for `saving` valid until `expires_at` (Unix seconds)
pub fn issue_marker(saving: &SavingRecord, expires_at: i64, secret: &str) -> Result<String> {
    let payload = marker_payload(saving.id, expires_at, &saving.pin_hash);
    let signature = sign_hmac(&payload, secret)?;
    Ok(format!("{}.{}.{}", saving.id, expires_at, signature))
}

/// Check a presented marker against the saving it claims to unlock
pub fn verify_marker(
    marker: Option<&str>,
    saving: &SavingRecord,
    secret: &str,
    now: i64,
) -> Result<()> {
    let marker = marker.ok_or(AppError::Unauthorized(ERR_MISSING_MARKER))?;

    let mut parts = marker.splitn(3, '.');
    let (Some(id), Some(expires_at), Some(signature)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized(ERR_INVALID_MARKER));
    };
    let (Ok(id), Ok(expires_at)) = (id.parse::<u64>(), expires_at.parse::<i64>()) else {
        return Err(AppError::Unauthorized(ERR_INVALID_MARKER));
    };

    if id != saving.id {
        tracing::warn!("Access key for saving {} presented to saving {}", id, saving.id);
        return Err(AppError::Unauthorized(ERR_INVALID_MARKER));
    }

    if now >= expires_at {
        tracing::info!("Expired access key for saving {}", saving.id);
        return Err(AppError::Unauthorized(ERR_INVALID_MARKER));
    }

    let payload = marker_payload(saving.id, expires_at, &saving.pin_hash);
    if !verify_hmac(&payload, signature, secret) {
        tracing::warn!("Access key signature mismatch for saving {}", saving.id);
        return Err(AppError::Unauthorized(ERR_INVALID_MARKER));
    }

    Ok(())
}

/// Unlock a saving with its PIN
///
/// Unknown ids, soft-deleted savings and wrong PINs all take the same path
/// and fail with `InvalidCredential`. Failures are counted per requested id
/// and lock further attempts for the rest of the window.
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn login(
    db: &Db,
    verifier: &CredentialVerifier,
    config: &Config,
    saving_id: u64,
    pin: &str,
) -> Result<SavingAccess> {
    if !Saving::validate_pin(pin) {
        return Err(AppError::validation(ERR_INVALID_PIN));
    }

    let now = Utc::now().timestamp();
    let saving = reserve_attempt(db, saving_id, now)?;

    let verified = verifier.verify(saving.as_ref().map(|s| s.pin_hash.as_str()), pin);

    match saving {
        Some(saving) if verified => {
            clear_attempts(db, saving_id)?;

            let expires_at = now + config.saving_access_ttl_secs;
            let key = issue_marker(&saving, expires_at, &config.saving_key_secret)?;
            tracing::info!("Saving {} unlocked", saving.id);
            Ok(SavingAccess {
                saving_id: saving.id,
                key,
                expires_at,
            })
        }
        _ => {
            tracing::warn!("Failed PIN login for saving {}", saving_id);
            Err(AppError::InvalidCredential)
        }
    }
}

/// Count an attempt against `saving_id` before its PIN is checked
///
/// The lockout check and the increment commit together, so parallel logins
/// cannot all pass the check before any failure is stored. A later success
/// clears the count. Returns the saving as seen by the same transaction.
fn reserve_attempt(db: &Db, saving_id: u64, now: i64) -> Result<Option<SavingRecord>> {
    let write_txn = db.begin_write()?;
    purge_expired_attempts(&write_txn, now)?;

    let saving = {
        let mut attempts = write_txn.open_table(tables::PIN_ATTEMPTS)?;
        let mut record = get_record::<PinAttemptRecord, _>(&attempts, saving_id)?
            .unwrap_or_else(|| PinAttemptRecord::new(now));
        record.check(now)?;
        record.record_failure(now);
        put_record(&mut attempts, saving_id, &record)?;

        let mut expiry = write_txn.open_multimap_table(tables::PIN_ATTEMPT_EXPIRY)?;
        expiry.insert(record.window_reset_at, saving_id)?;

        let savings = write_txn.open_table(tables::SAVINGS)?;
        get_active_saving(&savings, saving_id)?
    };
    write_txn.commit()?;

    Ok(saving)
}

fn clear_attempts(db: &Db, saving_id: u64) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let mut attempts = write_txn.open_table(tables::PIN_ATTEMPTS)?;
        attempts.remove(saving_id)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Drop attempt rows whose window has ended
///
/// Walks only the expired prefix of the expiry index. Index entries left
/// behind by cleared or restarted windows are removed without touching a
/// row that is still live.
fn purge_expired_attempts(write_txn: &WriteTransaction, now: i64) -> Result<()> {
    let mut expiry = write_txn.open_multimap_table(tables::PIN_ATTEMPT_EXPIRY)?;
    let mut attempts = write_txn.open_table(tables::PIN_ATTEMPTS)?;

    let mut expired = Vec::new();
    for entry in expiry.range(..=now)? {
        let (reset_at, saving_ids) = entry?;
        for saving_id in saving_ids {
            expired.push((reset_at.value(), saving_id?.value()));
        }
    }

    for &(reset_at, saving_id) in &expired {
        expiry.remove(reset_at, saving_id)?;
        let record = get_record::<PinAttemptRecord, _>(&attempts, saving_id)?;
        if record.is_some_and(|r| r.window_reset_at <= now) {
            attempts.remove(saving_id)?;
        }
    }

    if !expired.is_empty() {
        tracing::debug!("Purged {} expired PIN attempt entries", expired.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_PIN_FAILURES, PIN_FAILURE_WINDOW_SECS};
    use crate::db::{next_id, open_in_memory};
    use redb::{ReadableTable, ReadableTableMetadata};
    use std::sync::Barrier;

    const SECRET: &str = "saving-key-secret";

    fn test_config() -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            database_path: String::new(),
            allowed_origins: vec![],
            environment: "test".to_string(),
            jwt_secret: "jwt-secret".to_string(),
            saving_key_secret: SECRET.to_string(),
            bcrypt_cost: 4,
            saving_access_ttl_secs: 900,
        }
    }

    fn saving_with_pin(db: &Db, verifier: &CredentialVerifier, pin: &str) -> SavingRecord {
        let write_txn = db.begin_write().unwrap();
        let id = next_id(&write_txn, tables::SAVING_SEQUENCE).unwrap();
        let saving = SavingRecord::new(id, 1, "Car".to_string(), verifier.hash(pin).unwrap(), 0);
        {
            let mut savings = write_txn.open_table(tables::SAVINGS).unwrap();
            put_record(&mut savings, id, &saving).unwrap();
        }
        write_txn.commit().unwrap();
        saving
    }

    fn attempt_ids(db: &Db) -> Vec<u64> {
        let read_txn = db.begin_read().unwrap();
        let attempts = read_txn.open_table(tables::PIN_ATTEMPTS).unwrap();
        attempts
            .iter()
            .unwrap()
            .map(|entry| entry.unwrap().0.value())
            .collect()
    }

    fn expiry_entries(db: &Db) -> u64 {
        let read_txn = db.begin_read().unwrap();
        let expiry = read_txn
            .open_multimap_table(tables::PIN_ATTEMPT_EXPIRY)
            .unwrap();
        expiry.len().unwrap()
    }

    fn record(id: u64, pin_hash: &str) -> SavingRecord {
        SavingRecord::new(id, 1, "Car".to_string(), pin_hash.to_string(), 0)
    }

    // =========================================================================
    // Marker Tests
    // =========================================================================

    #[test]
    fn test_marker_round_trip() {
        let saving = record(3, "$2b$04$digest");
        let marker = issue_marker(&saving, 2000, SECRET).unwrap();

        assert!(marker.starts_with("3.2000."));
        assert!(!marker.contains("digest"));
        assert!(verify_marker(Some(&marker), &saving, SECRET, 1000).is_ok());
    }

    #[test]
    fn test_marker_missing_or_malformed() {
        let saving = record(3, "digest");

        for marker in [None, Some(""), Some("3"), Some("3.x.abc"), Some("a.2000.abc")] {
            assert!(matches!(
                verify_marker(marker, &saving, SECRET, 1000),
                Err(AppError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn test_marker_expires() {
        let saving = record(3, "digest");
        let marker = issue_marker(&saving, 2000, SECRET).unwrap();

        assert!(verify_marker(Some(&marker), &saving, SECRET, 1999).is_ok());
        assert!(verify_marker(Some(&marker), &saving, SECRET, 2000).is_err());
    }

    #[test]
    fn test_marker_scoped_to_one_saving() {
        let first = record(3, "digest");
        let second = record(4, "digest");
        let marker = issue_marker(&first, 2000, SECRET).unwrap();

        assert!(verify_marker(Some(&marker), &second, SECRET, 1000).is_err());

        // Rewriting the id prefix breaks the signature
        let forged = marker.replacen("3.", "4.", 1);
        assert!(verify_marker(Some(&forged), &second, SECRET, 1000).is_err());
    }

    #[test]
    fn test_marker_cannot_extend_expiry() {
        let saving = record(3, "digest");
        let marker = issue_marker(&saving, 2000, SECRET).unwrap();
        let forged = marker.replacen(".2000.", ".9999.", 1);

        assert!(verify_marker(Some(&forged), &saving, SECRET, 3000).is_err());
    }

    #[test]
    fn test_pin_change_revokes_marker() {
        let before = record(3, "old-digest");
        let after = record(3, "new-digest");
        let marker = issue_marker(&before, 2000, SECRET).unwrap();

        assert!(verify_marker(Some(&marker), &after, SECRET, 1000).is_err());
    }

    #[test]
    fn test_marker_wrong_secret() {
        let saving = record(3, "digest");
        let marker = issue_marker(&saving, 2000, "other-secret").unwrap();

        assert!(verify_marker(Some(&marker), &saving, SECRET, 1000).is_err());
    }

    // =========================================================================
    // Login Tests
    // =========================================================================

    #[test]
    fn test_login_success() {
        let db = open_in_memory().unwrap();
        let verifier = CredentialVerifier::new(4).unwrap();
        let config = test_config();
        let saving = saving_with_pin(&db, &verifier, "123456");

        let access = login(&db, &verifier, &config, saving.id, "123456").unwrap();
        assert_eq!(access.saving_id, saving.id);
        assert!(verify_marker(Some(&access.key), &saving, SECRET, Utc::now().timestamp()).is_ok());
    }

    #[test]
    fn test_wrong_pin_and_unknown_saving_fail_alike() {
        let db = open_in_memory().unwrap();
        let verifier = CredentialVerifier::new(4).unwrap();
        let config = test_config();
        let saving = saving_with_pin(&db, &verifier, "123456");

        assert!(matches!(
            login(&db, &verifier, &config, saving.id, "654321"),
            Err(AppError::InvalidCredential)
        ));
        assert!(matches!(
            login(&db, &verifier, &config, 999, "123456"),
            Err(AppError::InvalidCredential)
        ));
    }

    #[test]
    fn test_malformed_pin_is_validation_error() {
        let db = open_in_memory().unwrap();
        let verifier = CredentialVerifier::new(4).unwrap();
        let config = test_config();

        for pin in ["12345", "1234567", "12a456", ""] {
            assert!(matches!(
                login(&db, &verifier, &config, 1, pin),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_lockout_after_repeated_failures() {
        let db = open_in_memory().unwrap();
        let verifier = CredentialVerifier::new(4).unwrap();
        let config = test_config();
        let saving = saving_with_pin(&db, &verifier, "123456");

        for _ in 0..MAX_PIN_FAILURES {
            assert!(matches!(
                login(&db, &verifier, &config, saving.id, "000000"),
                Err(AppError::InvalidCredential)
            ));
        }

        // Even the right PIN is refused while locked
        assert!(matches!(
            login(&db, &verifier, &config, saving.id, "123456"),
            Err(AppError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_success_clears_failures() {
        let db = open_in_memory().unwrap();
        let verifier = CredentialVerifier::new(4).unwrap();
        let config = test_config();
        let saving = saving_with_pin(&db, &verifier, "123456");

        for _ in 0..MAX_PIN_FAILURES - 1 {
            let _ = login(&db, &verifier, &config, saving.id, "000000");
        }
        login(&db, &verifier, &config, saving.id, "123456").unwrap();

        let read_txn = db.begin_read().unwrap();
        let attempts = read_txn.open_table(tables::PIN_ATTEMPTS).unwrap();
        assert!(attempts.get(saving.id).unwrap().is_none());
    }

    #[test]
    fn test_parallel_wrong_pins_respect_lockout() {
        let db = open_in_memory().unwrap();
        let verifier = CredentialVerifier::new(4).unwrap();
        let config = test_config();
        let saving = saving_with_pin(&db, &verifier, "123456");

        let threads = 20;
        let barrier = Barrier::new(threads);
        let results: Vec<Result<SavingAccess>> = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..threads {
                handles.push(scope.spawn(|| {
                    barrier.wait();
                    login(&db, &verifier, &config, saving.id, "000000")
                }));
            }
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let evaluated = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::InvalidCredential)))
            .count();
        let limited = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::RateLimitExceeded)))
            .count();

        assert_eq!(evaluated, MAX_PIN_FAILURES as usize);
        assert_eq!(limited, threads - MAX_PIN_FAILURES as usize);
    }

    #[test]
    fn test_expired_attempt_rows_are_purged() {
        let db = open_in_memory().unwrap();
        let start = 1_000_000;

        // Ids without a saving behind them still leave a row
        for id in [7, 8, 9] {
            assert!(reserve_attempt(&db, id, start).unwrap().is_none());
        }
        assert_eq!(attempt_ids(&db), vec![7, 8, 9]);

        reserve_attempt(&db, 10, start + PIN_FAILURE_WINDOW_SECS - 1).unwrap();
        assert_eq!(attempt_ids(&db), vec![7, 8, 9, 10]);

        reserve_attempt(&db, 11, start + PIN_FAILURE_WINDOW_SECS).unwrap();
        assert_eq!(attempt_ids(&db), vec![10, 11]);
        assert_eq!(expiry_entries(&db), 2);
    }

    #[test]
    fn test_purge_keeps_restarted_window() {
        let db = open_in_memory().unwrap();
        let start = 1_000_000;

        reserve_attempt(&db, 7, start).unwrap();
        clear_attempts(&db, 7).unwrap();
        reserve_attempt(&db, 7, start + 100).unwrap();

        // The first window's index entry is stale; the live row survives it
        reserve_attempt(&db, 8, start + PIN_FAILURE_WINDOW_SECS).unwrap();
        assert_eq!(attempt_ids(&db), vec![7, 8]);

        reserve_attempt(&db, 9, start + 100 + PIN_FAILURE_WINDOW_SECS).unwrap();
        assert_eq!(attempt_ids(&db), vec![8, 9]);
        assert_eq!(expiry_entries(&db), 2);
    }
}
