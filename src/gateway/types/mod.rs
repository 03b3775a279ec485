//! Gateway types module
//!
//! ## Input Types
//! - [`CreateAccountRequest`], [`ListAccountsQuery`]
//! - [`TransferRequest`](crate::ledger::TransferRequest) is deserialized directly
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: Error response with HTTP status

pub mod response;

use serde::{Deserialize, Serialize};

pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};

/// POST /api/v1/accounts body
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub owner: String,
    pub currency: String,
}

/// GET /api/v1/accounts query
#[derive(Debug, Clone, Deserialize)]
pub struct ListAccountsQuery {
    pub page_id: i32,
    pub page_size: i32,
}

/// DELETE /api/v1/accounts/{id} response data
#[derive(Debug, Clone, Serialize)]
pub struct DeletedData {
    pub id: i64,
    pub status: &'static str,
}
