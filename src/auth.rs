//! Primary user session: signed bearer tokens and the `AuthUser` extractor.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::constants::{REMEMBERED_SESSION_TTL_HOURS, SESSION_TTL_HOURS};
use crate::db::{records::get_active_user, tables};
use crate::error::{AppError, Result};
use crate::models::UserRecord;

const ERR_MISSING_TOKEN: &str = "No session token in header";
const ERR_INVALID_TOKEN: &str = "Invalid or expired session token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub email: String,
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
}

/// Issue a session token for a user who just proved their password
pub fn issue_session_token(user: &UserRecord, remember: bool, secret: &str) -> Result<String> {
    let hours = if remember {
        REMEMBERED_SESSION_TTL_HOURS
    } else {
        SESSION_TTL_HOURS
    };
    let now = Utc::now();

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(hours)).timestamp(),
    };

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &encoding_key)?)
}

/// Verify signature and expiry, returning the claims
pub fn verify_session_token(token: &str, secret: &str) -> Result<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("Session token rejected: {}", e);
            AppError::Unauthorized(ERR_INVALID_TOKEN)
        })
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Whether the request already carries any session credential
pub fn has_session_header(headers: &HeaderMap) -> bool {
    headers.contains_key(AUTHORIZATION)
}

/// Identity of the caller, proven by a valid session token
///
/// Can be used as an extractor in handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: u64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token =
            bearer_token(&parts.headers).ok_or(AppError::Unauthorized(ERR_MISSING_TOKEN))?;
        let claims = verify_session_token(token, &state.config.jwt_secret)?;
        let user_id: u64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized(ERR_INVALID_TOKEN))?;

        // A token outliving its user is no longer a valid identity
        let db = state.db.clone();
        let exists = tokio::task::spawn_blocking(move || -> Result<bool> {
            let read_txn = db.begin_read()?;
            let users = read_txn.open_table(tables::USERS)?;
            Ok(get_active_user(&users, user_id)?.is_some())
        })
        .await??;

        if !exists {
            tracing::warn!("Session token for unknown user {}", user_id);
            return Err(AppError::Unauthorized(ERR_INVALID_TOKEN));
        }

        Ok(AuthUser { user_id })
    }
}
