pub mod pin_attempt;
pub mod saving;
pub mod transaction;
pub mod user;

pub use pin_attempt::PinAttemptRecord;
pub use saving::{Saving, SavingDetail, SavingRecord, SavingSummary};
pub use transaction::{Transaction, TransactionKind, TransactionRecord};
pub use user::{User, UserRecord};
