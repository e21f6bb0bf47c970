use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::access::{self, SavingAccess, verify_marker};
use crate::auth::AuthUser;
use crate::constants::*;
use crate::db::{
    next_id,
    records::{get_active_saving, list_saving_transactions, list_user_savings, put_record},
    tables,
};
use crate::error::{AppError, Result};
use crate::models::{Saving, SavingDetail, SavingRecord, SavingSummary, Transaction};
use crate::ownership::load_owned_saving;

#[derive(Debug, Deserialize)]
pub struct SavingForm {
    pub name: String,
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct SavingLoginRequest {
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSavingResponse {
    pub success: bool,
    #[serde(rename = "savingId")]
    pub saving_id: u64,
}

#[derive(Debug, Serialize)]
pub struct ListSavingsResponse {
    pub data: Vec<SavingSummary>,
    pub qty: usize,
}

#[derive(Debug, Serialize)]
pub struct SavingLoginResponse {
    #[serde(rename = "savingId")]
    pub saving_id: u64,
    pub key: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl From<SavingAccess> for SavingLoginResponse {
    fn from(access: SavingAccess) -> Self {
        Self {
            saving_id: access.saving_id,
            key: access.key,
            expires_at: access.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShowSavingResponse {
    pub data: SavingDetail,
}

#[derive(Debug, Serialize)]
pub struct SavingUpdateResponse {
    pub success: bool,
}

fn validate_form(form: &SavingForm) -> Result<()> {
    if !Saving::validate_name(&form.name) {
        return Err(AppError::validation(ERR_INVALID_SAVING_NAME));
    }
    if !Saving::validate_pin(&form.pin) {
        return Err(AppError::validation(ERR_INVALID_PIN));
    }
    Ok(())
}

/// Create a saving owned by the caller, starting at balance 0
pub async fn create_saving(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SavingForm>,
) -> Result<Json<CreateSavingResponse>> {
    validate_form(&payload)?;

    let credentials = state.credentials.clone();
    let db = state.db.clone();
    let user_id = auth.user_id;

    let saving_id = tokio::task::spawn_blocking(move || -> Result<u64> {
        let pin_hash = credentials.hash(&payload.pin)?;
        let now = Utc::now().timestamp();

        let write_txn = db.begin_write()?;
        let saving_id = next_id(&write_txn, tables::SAVING_SEQUENCE)?;
        {
            let saving = SavingRecord::new(
                saving_id,
                user_id,
                payload.name.trim().to_string(),
                pin_hash,
                now,
            );
            let mut savings = write_txn.open_table(tables::SAVINGS)?;
            put_record(&mut savings, saving_id, &saving)?;

            let mut index = write_txn.open_multimap_table(tables::USER_SAVINGS)?;
            index.insert(user_id, saving_id)?;
        }
        write_txn.commit()?;

        Ok(saving_id)
    })
    .await??;

    tracing::info!("Saving {} created for user {}", saving_id, user_id);

    Ok(Json(CreateSavingResponse {
        success: true,
        saving_id,
    }))
}

/// List the caller's savings
pub async fn list_savings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListSavingsResponse>> {
    let db = state.db.clone();
    let user_id = auth.user_id;

    let data = tokio::task::spawn_blocking(move || -> Result<Vec<SavingSummary>> {
        let read_txn = db.begin_read()?;
        let savings = list_user_savings(&read_txn, user_id)?;
        Ok(savings.iter().map(SavingSummary::from).collect())
    })
    .await??;

    Ok(Json(ListSavingsResponse {
        qty: data.len(),
        data,
    }))
}

/// Unlock a saving with its PIN and receive an access key
pub async fn login_saving(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(saving_id): Path<u64>,
    Json(payload): Json<SavingLoginRequest>,
) -> Result<Json<SavingLoginResponse>> {
    let access = tokio::task::spawn_blocking(move || {
        access::login(
            &state.db,
            &state.credentials,
            &state.config,
            saving_id,
            &payload.pin,
        )
    })
    .await??;

    Ok(Json(access.into()))
}

/// Show a saving and its ledger; requires the saving's access key
pub async fn show_saving(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(saving_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<ShowSavingResponse>> {
    let marker = headers
        .get(SAVING_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let db = state.db.clone();
    let secret = state.config.saving_key_secret.clone();

    let data = tokio::task::spawn_blocking(move || -> Result<SavingDetail> {
        let read_txn = db.begin_read()?;
        let saving = {
            let savings = read_txn.open_table(tables::SAVINGS)?;
            get_active_saving(&savings, saving_id)?
                .ok_or(AppError::NotFound(ERR_SAVING_NOT_FOUND))?
        };

        verify_marker(
            marker.as_deref(),
            &saving,
            &secret,
            Utc::now().timestamp(),
        )?;

        let transactions = list_saving_transactions(&read_txn, saving_id)?;
        Ok(SavingDetail {
            saving: Saving::from(&saving),
            transactions: transactions.iter().map(Transaction::from).collect(),
        })
    })
    .await??;

    Ok(Json(ShowSavingResponse { data }))
}

/// Replace name and PIN of a saving owned by the caller
///
/// Outstanding access keys stop working because they are bound to the old
/// PIN digest.
pub async fn update_saving(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(saving_id): Path<u64>,
    Json(payload): Json<SavingForm>,
) -> Result<Json<SavingUpdateResponse>> {
    validate_form(&payload)?;

    let credentials = state.credentials.clone();
    let db = state.db.clone();
    let user_id = auth.user_id;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let pin_hash = credentials.hash(&payload.pin)?;

        let write_txn = db.begin_write()?;
        {
            let mut savings = write_txn.open_table(tables::SAVINGS)?;
            let mut saving = load_owned_saving(&savings, Some(user_id), saving_id)?;

            saving.name = payload.name.trim().to_string();
            saving.pin_hash = pin_hash;
            saving.updated_at = Utc::now().timestamp();
            put_record(&mut savings, saving_id, &saving)?;
        }
        write_txn.commit()?;

        Ok(())
    })
    .await??;

    tracing::info!("Saving {} updated by user {}", saving_id, user_id);

    Ok(Json(SavingUpdateResponse { success: true }))
}

/// Soft-delete a saving owned by the caller
///
/// The balance must already be zero; value is never discarded by deletion.
pub async fn delete_saving(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(saving_id): Path<u64>,
) -> Result<Json<SavingUpdateResponse>> {
    let db = state.db.clone();
    let user_id = auth.user_id;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let write_txn = db.begin_write()?;
        {
            let mut savings = write_txn.open_table(tables::SAVINGS)?;
            let mut saving = load_owned_saving(&savings, Some(user_id), saving_id)?;

            if saving.balance != 0 {
                tracing::warn!(
                    "Delete of saving {} refused: balance {}",
                    saving_id,
                    saving.balance
                );
                return Err(AppError::SavingNotEmpty);
            }

            let now = Utc::now().timestamp();
            saving.deleted_at = Some(now);
            saving.updated_at = now;
            put_record(&mut savings, saving_id, &saving)?;
        }
        write_txn.commit()?;

        Ok(())
    })
    .await??;

    tracing::info!("Saving {} deleted by user {}", saving_id, user_id);

    Ok(Json(SavingUpdateResponse { success: true }))
}
