use axum::{Json, extract::State, http::HeaderMap};
use chrono::Utc;
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::{AuthUser, has_session_header, issue_session_token};
use crate::constants::*;
use crate::db::{
    next_id,
    records::{find_user_by_email, get_active_user, put_record},
    tables,
};
use crate::error::{AppError, Result};
use crate::models::{User, UserRecord};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(rename = "userId")]
    pub user_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: u64,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "oldPassword")]
    pub old_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub success: bool,
}

/// Register a new user
///
/// Returns 409 Conflict if the email is already registered and 403 if the
/// request already carries a session token.
pub async fn register_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    if has_session_header(&headers) {
        return Err(AppError::Forbidden(ERR_ALREADY_LOGGED_IN));
    }

    if !User::validate_name(&payload.name) {
        return Err(AppError::validation(ERR_INVALID_USER_NAME));
    }
    if !User::validate_email(&payload.email) {
        return Err(AppError::validation(ERR_INVALID_EMAIL));
    }
    if !User::validate_password(&payload.password) {
        return Err(AppError::validation(ERR_CREDENTIAL_TOO_SHORT));
    }

    let name = payload.name.trim().to_string();
    let email = User::normalize_email(&payload.email);
    let credentials = state.credentials.clone();
    let db = state.db.clone();

    let user_id = tokio::task::spawn_blocking(move || -> Result<u64> {
        let password_hash = credentials.hash(&payload.password)?;
        let now = Utc::now().timestamp();

        let write_txn = db.begin_write()?;
        let user_id = {
            let mut emails = write_txn.open_table(tables::USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                tracing::info!("Registration for an existing email rejected");
                return Err(AppError::UserAlreadyExists);
            }

            let user_id = next_id(&write_txn, tables::USER_SEQUENCE)?;
            emails.insert(email.as_str(), user_id)?;

            let mut users = write_txn.open_table(tables::USERS)?;
            let record = UserRecord {
                id: user_id,
                name,
                email,
                password_hash,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            put_record(&mut users, user_id, &record)?;
            user_id
        };
        write_txn.commit()?;

        Ok(user_id)
    })
    .await??;

    tracing::info!("New user registered: {}", user_id);

    Ok(Json(RegisterResponse {
        success: true,
        user_id,
    }))
}

/// Log in with email and password
///
/// Unknown emails and wrong passwords are indistinguishable: both cost one
/// bcrypt verification and both answer 403 "Invalid credentials".
pub async fn login_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    if has_session_header(&headers) {
        return Err(AppError::Forbidden(ERR_ALREADY_LOGGED_IN));
    }

    if payload.email.trim().len() < MIN_CREDENTIAL_LEN
        || payload.password.len() < MIN_CREDENTIAL_LEN
    {
        return Err(AppError::validation(ERR_CREDENTIAL_TOO_SHORT));
    }

    let email = User::normalize_email(&payload.email);
    let credentials = state.credentials.clone();
    let db = state.db.clone();

    let user = tokio::task::spawn_blocking(move || -> Result<UserRecord> {
        let read_txn = db.begin_read()?;
        let user = find_user_by_email(&read_txn, &email)?;
        drop(read_txn);

        let verified = credentials.verify(
            user.as_ref().map(|u| u.password_hash.as_str()),
            &payload.password,
        );
        match user {
            Some(user) if verified => Ok(user),
            _ => {
                tracing::warn!("Failed login attempt");
                Err(AppError::InvalidCredential)
            }
        }
    })
    .await??;

    let token = issue_session_token(&user, payload.remember, &state.config.jwt_secret)?;

    tracing::info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        user_name: user.name,
        user_email: user.email,
    }))
}

/// Change the caller's password after verifying the current one
///
/// The stored digest is replaced only if it is still the one the old
/// password was checked against.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>> {
    if payload.new_password != payload.confirm_password {
        return Err(AppError::validation(ERR_PASSWORD_MISMATCH));
    }
    if !User::validate_password(&payload.new_password) {
        return Err(AppError::validation(ERR_CREDENTIAL_TOO_SHORT));
    }

    let credentials = state.credentials.clone();
    let db = state.db.clone();
    let user_id = auth.user_id;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let verified_hash = {
            let read_txn = db.begin_read()?;
            let users = read_txn.open_table(tables::USERS)?;
            get_active_user(&users, user_id)?
                .ok_or(AppError::Unauthorized("User no longer exists"))?
                .password_hash
        };

        if !credentials.verify(Some(&verified_hash), &payload.old_password) {
            tracing::warn!("Password change for user {} with wrong old password", user_id);
            return Err(AppError::InvalidCredential);
        }

        let new_hash = credentials.hash(&payload.new_password)?;

        let write_txn = db.begin_write()?;
        {
            let mut users = write_txn.open_table(tables::USERS)?;
            let mut user = get_active_user(&users, user_id)?
                .ok_or(AppError::Unauthorized("User no longer exists"))?;

            if user.password_hash != verified_hash {
                tracing::warn!("Password of user {} changed concurrently", user_id);
                return Err(AppError::InvalidCredential);
            }

            user.password_hash = new_hash;
            user.updated_at = Utc::now().timestamp();
            put_record(&mut users, user_id, &user)?;
        }
        write_txn.commit()?;

        Ok(())
    })
    .await??;

    tracing::info!("Password changed for user {}", user_id);

    Ok(Json(ChangePasswordResponse { success: true }))
}
