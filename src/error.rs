use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Saving balance is not empty")]
    SavingNotEmpty,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl AppError {
    /// Shorthand for a validation failure with a static message
    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    /// Whether this error comes from the storage layer rather than the caller
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Transaction(_)
                | AppError::Table(_)
                | AppError::Storage(_)
                | AppError::Commit(_)
                | AppError::Serialization(_)
                | AppError::Deserialization(_)
                | AppError::TaskJoin(_)
                | AppError::Hashing(_)
                | AppError::Token(_)
                | AppError::Signing(_)
        )
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_storage() {
            tracing::error!("Internal failure: {:?}", self);
            let body = Json(json!({ "error": "Internal server error" }));
            return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        }

        let (status, error_message) = match self {
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::InvalidCredential => (StatusCode::FORBIDDEN, "Invalid credentials"),
            AppError::InsufficientFunds => (
                StatusCode::NOT_ACCEPTABLE,
                "Balance can not be lower than 0",
            ),
            AppError::UserAlreadyExists => (StatusCode::CONFLICT, "User already exists"),
            AppError::SavingNotEmpty => (
                StatusCode::CONFLICT,
                "Saving balance must be withdrawn before deletion",
            ),
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many failed attempts, try again later",
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("gone"), StatusCode::NOT_FOUND),
            (AppError::Forbidden("no"), StatusCode::FORBIDDEN),
            (AppError::Unauthorized("who"), StatusCode::UNAUTHORIZED),
            (AppError::InvalidCredential, StatusCode::FORBIDDEN),
            (AppError::InsufficientFunds, StatusCode::NOT_ACCEPTABLE),
            (AppError::UserAlreadyExists, StatusCode::CONFLICT),
            (AppError::SavingNotEmpty, StatusCode::CONFLICT),
            (AppError::RateLimitExceeded, StatusCode::TOO_MANY_REQUESTS),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_storage_errors_are_generic() {
        let err = AppError::Storage(redb::StorageError::Corrupted("disk".to_string()));
        assert!(err.is_storage());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_signing_errors_are_generic() {
        let err = AppError::Signing("invalid key length".to_string());
        assert!(err.is_storage());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
