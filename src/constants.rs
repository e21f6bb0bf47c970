/// Exact number of digits in a saving PIN
pub const PIN_LENGTH: usize = 6;

/// Minimum characters in a saving name
pub const MIN_SAVING_NAME_LEN: usize = 3;

/// Maximum characters in a saving name
pub const MAX_SAVING_NAME_LEN: usize = 100;

/// Minimum characters for login email and passwords
pub const MIN_CREDENTIAL_LEN: usize = 3;

/// Maximum characters in a user display name
pub const MAX_USER_NAME_LEN: usize = 100;

/// Maximum characters in an email address
pub const MAX_EMAIL_LEN: usize = 300;

/// Maximum characters in a transaction description
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Session lifetime for a normal login (24 hours)
pub const SESSION_TTL_HOURS: i64 = 24;

/// Session lifetime when the user asks to be remembered (1 year)
pub const REMEMBERED_SESSION_TTL_HOURS: i64 = 8760;

/// Default lifetime of a saving access marker (15 minutes)
pub const DEFAULT_SAVING_ACCESS_TTL_SECS: i64 = 900;

/// Failed PIN logins allowed per saving inside one window
pub const MAX_PIN_FAILURES: u32 = 5;

/// Length of the PIN failure window in seconds (15 minutes)
pub const PIN_FAILURE_WINDOW_SECS: i64 = 900;

/// Header carrying the saving access marker
pub const SAVING_KEY_HEADER: &str = "x-saving-key";

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_INVALID_SAVING_NAME: &str = "Saving name must be between 3 and 100 characters";

pub const ERR_INVALID_PIN: &str = "PIN must be numeric with 6 digits";

pub const ERR_INVALID_USER_NAME: &str = "Name must be between 1 and 100 characters";

pub const ERR_INVALID_EMAIL: &str = "Email must be a valid address of at most 300 characters";

pub const ERR_CREDENTIAL_TOO_SHORT: &str = "Email and password must be at least 3 characters";

pub const ERR_PASSWORD_MISMATCH: &str = "New password and confirmation do not match";

pub const ERR_INVALID_TRANSACTION_TYPE: &str =
    "Wrong transaction type, must be DEPOSIT or WITHDRAWAL";

pub const ERR_INVALID_TRANSACTION_VALUE: &str = "Transaction value must be greater than 0";

pub const ERR_DESCRIPTION_TOO_LONG: &str = "Description must be at most 255 characters";

pub const ERR_BALANCE_OVERFLOW: &str = "Transaction value is too large";

pub const ERR_ALREADY_LOGGED_IN: &str = "User is already logged in";

pub const ERR_SAVING_NOT_FOUND: &str = "Saving not found";

pub const ERR_NOT_SAVING_OWNER: &str = "You are not allowed to access this saving";
