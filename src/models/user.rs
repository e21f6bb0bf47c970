use serde::{Deserialize, Serialize};

use crate::constants::{MAX_EMAIL_LEN, MAX_USER_NAME_LEN, MIN_CREDENTIAL_LEN};

/// User record stored in redb
/// Uses Unix timestamps for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    /// Lower-cased, also the key of the unique email index
    pub email: String,
    /// bcrypt digest, never leaves the server
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
}

impl From<&UserRecord> for User {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            created_at: record.created_at,
        }
    }
}

impl User {
    /// Display names must be non-empty after trimming and bounded in length
    pub fn validate_name(name: &str) -> bool {
        let trimmed = name.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= MAX_USER_NAME_LEN
    }

    /// Loose structural check: one `@` with something on both sides
    pub fn validate_email(email: &str) -> bool {
        let email = email.trim();
        if email.len() < MIN_CREDENTIAL_LEN || email.chars().count() > MAX_EMAIL_LEN {
            return false;
        }
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        }
    }

    pub fn validate_password(password: &str) -> bool {
        password.chars().count() >= MIN_CREDENTIAL_LEN
    }

    /// Emails are unique case-insensitively
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}
