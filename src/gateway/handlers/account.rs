//! Account handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::state::AppState;
use super::super::types::{ApiResult, CreateAccountRequest, DeletedData, ListAccountsQuery, ok};
use super::check_id;
use crate::ledger::{Account, Entry};

/// POST /api/v1/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    let account = state
        .accounts
        .create_account(&req.owner, &req.currency)
        .await?;
    ok(account)
}

/// GET /api/v1/accounts/{id}
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Account> {
    let account = state.accounts.get_account(check_id(id)?).await?;
    ok(account)
}

/// GET /api/v1/accounts?page_id=1&page_size=10
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Vec<Account>> {
    let accounts = state
        .accounts
        .list_accounts(query.page_id, query.page_size)
        .await?;
    ok(accounts)
}

/// DELETE /api/v1/accounts/{id}
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<DeletedData> {
    state.accounts.delete_account(check_id(id)?).await?;
    ok(DeletedData {
        id,
        status: "deleted",
    })
}

/// GET /api/v1/accounts/{id}/entries
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Entry>> {
    let entries = state.accounts.list_entries(check_id(id)?).await?;
    ok(entries)
}
