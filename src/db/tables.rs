use redb::{MultimapTableDefinition, TableDefinition};

/// Users table: user_id -> UserRecord (serialized)
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique email index: lower-cased email -> user_id
pub const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Savings table: saving_id -> SavingRecord (serialized)
pub const SAVINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("savings");

/// User savings index: user_id -> saving_id (one row per saving)
pub const USER_SAVINGS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_savings");

/// Transactions table: transaction_id -> TransactionRecord (serialized)
pub const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

/// Saving ledger index: saving_id -> transaction_id
pub const SAVING_TRANSACTIONS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("saving_transactions");

/// Id sequences: sequence name -> last issued id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// PIN attempts table: saving_id -> PinAttemptRecord (serialized)
pub const PIN_ATTEMPTS: TableDefinition<u64, &[u8]> = TableDefinition::new("pin_attempts");

/// PIN attempt expiry index: window_reset_at -> saving_id
pub const PIN_ATTEMPT_EXPIRY: MultimapTableDefinition<i64, u64> =
    MultimapTableDefinition::new("pin_attempt_expiry");

pub const USER_SEQUENCE: &str = "users";
pub const SAVING_SEQUENCE: &str = "savings";
pub const TRANSACTION_SEQUENCE: &str = "transactions";
