use axum::{Json, extract::State, http::HeaderMap};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::access::verify_marker;
use crate::auth::AuthUser;
use crate::constants::SAVING_KEY_HEADER;
use crate::error::Result;
use crate::ledger::{LedgerEntry, record_transaction};
use crate::models::{Transaction, TransactionKind};

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "saving")]
    pub saving_id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: i64,
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTransactionResponse {
    pub success: bool,
    pub transaction: Transaction,
    pub balance: i64,
}

impl From<LedgerEntry> for CreateTransactionResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            success: true,
            transaction: entry.transaction,
            balance: entry.balance,
        }
    }
}

/// Deposit into or withdraw from a saving
///
/// Checks run in order: transaction type, saving exists, caller owns it,
/// caller holds a live access key for it. All but the first run on the
/// saving as loaded by the ledger's write transaction, so a PIN change that
/// commits first revokes the key for this request too.
pub async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<Json<CreateTransactionResponse>> {
    let kind: TransactionKind = payload.kind.parse()?;

    let marker = headers
        .get(SAVING_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let db = state.db.clone();
    let secret = state.config.saving_key_secret.clone();
    let user_id = auth.user_id;

    let entry = tokio::task::spawn_blocking(move || {
        record_transaction(
            &db,
            Some(user_id),
            payload.saving_id,
            kind,
            payload.value,
            payload.description,
            |saving| verify_marker(marker.as_deref(), saving, &secret, Utc::now().timestamp()),
        )
    })
    .await??;

    Ok(Json(entry.into()))
}
