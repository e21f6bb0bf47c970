use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{ERR_INVALID_TRANSACTION_TYPE, MAX_DESCRIPTION_LEN};
use crate::error::AppError;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
        }
    }

    /// Sign a caller-supplied positive amount
    pub fn signed(&self, value: i64) -> i64 {
        match self {
            TransactionKind::Deposit => value,
            TransactionKind::Withdrawal => -value,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(TransactionKind::Deposit),
            "WITHDRAWAL" => Ok(TransactionKind::Withdrawal),
            _ => Err(AppError::validation(ERR_INVALID_TRANSACTION_TYPE)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry stored in redb, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub saving_id: u64,
    pub kind: TransactionKind,
    /// Positive for deposits, negative for withdrawals
    pub value: i64,
    pub description: Option<String>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// Transaction model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub saving_id: u64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub value: i64,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<&TransactionRecord> for Transaction {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id,
            saving_id: record.saving_id,
            kind: record.kind,
            value: record.value,
            description: record.description.clone(),
            created_at: record.created_at,
        }
    }
}

impl Transaction {
    pub fn validate_description(description: &str) -> bool {
        description.chars().count() <= MAX_DESCRIPTION_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_case_insensitive() {
        assert_eq!(
            "deposit".parse::<TransactionKind>().unwrap(),
            TransactionKind::Deposit
        );
        assert_eq!(
            "WithDrawal".parse::<TransactionKind>().unwrap(),
            TransactionKind::Withdrawal
        );
        assert_eq!(
            " DEPOSIT ".parse::<TransactionKind>().unwrap(),
            TransactionKind::Deposit
        );
    }

    #[test]
    fn test_parse_kind_rejects_unknown() {
        assert!(matches!(
            "transfer".parse::<TransactionKind>(),
            Err(AppError::Validation(_))
        ));
        assert!("".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_signed_value() {
        assert_eq!(TransactionKind::Deposit.signed(500), 500);
        assert_eq!(TransactionKind::Withdrawal.signed(500), -500);
    }

    #[test]
    fn test_kind_serializes_upper_case() {
        let json = serde_json::to_value(TransactionKind::Withdrawal).unwrap();
        assert_eq!(json, "WITHDRAWAL");
        assert_eq!(TransactionKind::Deposit.to_string(), "DEPOSIT");
    }

    #[test]
    fn test_validate_description() {
        assert!(Transaction::validate_description(""));
        assert!(Transaction::validate_description(&"d".repeat(255)));
        assert!(!Transaction::validate_description(&"d".repeat(256)));
    }
}
