//! Transfer handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};
use super::check_id;
use crate::ledger::{Transfer, TransferRequest, TransferTxResult};

/// Create transfer endpoint
///
/// POST /api/v1/transfers
///
/// Validates amount, accounts and currency, then runs the transfer as one
/// unit of work. The response carries the transfer, both entries and both
/// updated accounts.
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferTxResult> {
    if req.from_account_id < 1 || req.to_account_id < 1 {
        return ApiError::bad_request("account ids must be >= 1").into_err();
    }

    let result = state.transfers.create_transfer(req).await?;
    ok(result)
}

/// GET /api/v1/transfers/{id}
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Transfer> {
    let transfer = state.transfers.get_transfer(check_id(id)?).await?;
    ok(transfer)
}
