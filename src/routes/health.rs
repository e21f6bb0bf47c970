use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::AppState;
use crate::db::tables;

/// Liveness and storage check
///
/// Opens the sequences table in a read transaction; any failure reports the
/// service as unavailable so load balancers stop routing to it.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db = state.db.clone();
    let storage_ok = tokio::task::spawn_blocking(move || {
        db.begin_read()
            .map_err(|e| e.to_string())
            .and_then(|read_txn| {
                read_txn
                    .open_table(tables::SEQUENCES)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .inspect_err(|e| tracing::error!("Storage health check failed: {}", e))
            .is_ok()
    })
    .await
    .unwrap_or(false);

    let status = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if storage_ok { "healthy" } else { "unhealthy" },
            "storage": if storage_ok { "ok" } else { "unavailable" },
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
