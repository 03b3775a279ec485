//! HTTP handlers

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{create_account, delete_account, get_account, list_accounts, list_entries};
pub use health::health_check;
pub use transfer::{create_transfer, get_transfer};

use super::types::ApiError;

/// Path ids are BIGSERIAL values, so anything below 1 is a bad request
pub(crate) fn check_id(id: i64) -> Result<i64, ApiError> {
    if id < 1 {
        return Err(ApiError::bad_request(format!(
            "id must be >= 1, got {}",
            id
        )));
    }
    Ok(id)
}
