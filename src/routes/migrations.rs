//! Migration status endpoint

use crate::error::ApiResult;
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PendingMigrations {
    pub pending: Vec<String>,
}

/// Versions of the configured source not yet recorded in the ledger.
/// Read-only: never creates the ledger table.
pub async fn pending_migrations(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<PendingMigrations>>> {
    let pending = state
        .store
        .pending_migrations(state.migrations.as_ref())?;

    Ok(Json(SuccessResponse::with_data(
        "Migration status retrieved successfully.",
        PendingMigrations { pending },
    )))
}
