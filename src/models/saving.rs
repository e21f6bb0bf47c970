use serde::{Deserialize, Serialize};

use crate::constants::{MAX_SAVING_NAME_LEN, MIN_SAVING_NAME_LEN, PIN_LENGTH};

use super::Transaction;

/// Saving account record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingRecord {
    pub id: u64,
    /// Owning user, fixed at creation
    pub user_id: u64,
    pub name: String,
    /// Equal to the sum of the saving's transaction values
    pub balance: i64,
    /// bcrypt digest of the 6-digit PIN
    pub pin_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl SavingRecord {
    pub fn new(id: u64, user_id: u64, name: String, pin_hash: String, now: i64) -> Self {
        Self {
            id,
            user_id,
            name,
            balance: 0,
            pin_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Saving model for API responses (no PIN digest)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saving {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub balance: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&SavingRecord> for Saving {
    fn from(record: &SavingRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name.clone(),
            balance: record.balance,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Entry of the saving index listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingSummary {
    pub id: u64,
    pub name: String,
    pub balance: i64,
}

impl From<&SavingRecord> for SavingSummary {
    fn from(record: &SavingRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            balance: record.balance,
        }
    }
}

/// A saving together with its ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingDetail {
    #[serde(flatten)]
    pub saving: Saving,
    pub transactions: Vec<Transaction>,
}

impl Saving {
    pub fn validate_name(name: &str) -> bool {
        let len = name.trim().chars().count();
        (MIN_SAVING_NAME_LEN..=MAX_SAVING_NAME_LEN).contains(&len)
    }

    /// A PIN is exactly six ASCII digits, nothing else
    pub fn validate_pin(pin: &str) -> bool {
        pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(Saving::validate_name("Car"));
        assert!(Saving::validate_name("Holiday fund"));
        assert!(!Saving::validate_name("ab"));
        assert!(!Saving::validate_name("  ab  "));
        assert!(!Saving::validate_name(""));
        assert!(!Saving::validate_name(&"x".repeat(101)));
    }

    #[test]
    fn test_validate_pin() {
        assert!(Saving::validate_pin("123456"));
        assert!(Saving::validate_pin("000000"));

        // Wrong length
        assert!(!Saving::validate_pin("12345"));
        assert!(!Saving::validate_pin("1234567"));

        // Not numeric
        assert!(!Saving::validate_pin("12345a"));
        assert!(!Saving::validate_pin("-12345"));
        assert!(!Saving::validate_pin("+12345"));
        assert!(!Saving::validate_pin(" 12345"));

        // Non-ASCII digits
        assert!(!Saving::validate_pin("١٢٣٤٥٦"));
    }

    #[test]
    fn test_new_saving_starts_empty() {
        let record = SavingRecord::new(1, 2, "Car".to_string(), "digest".to_string(), 100);
        assert_eq!(record.balance, 0);
        assert!(record.is_active());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_public_view_drops_pin_hash() {
        let record = SavingRecord::new(1, 2, "Car".to_string(), "digest".to_string(), 100);
        let json = serde_json::to_value(Saving::from(&record)).unwrap();
        assert!(json.get("pin_hash").is_none());
        assert_eq!(json["balance"], 0);
    }
}
