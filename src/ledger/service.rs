//! Ledger services: input validation in front of the store and coordinator

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::coordinator::TransferCoordinator;
use super::error::LedgerError;
use super::models::{
    Account, CreateAccountParams, Entry, Transfer, TransferTxParams, TransferTxResult,
    is_supported_currency,
};
use super::store::LedgerStore;

pub const MIN_PAGE_SIZE: i32 = 5;
pub const MAX_PAGE_SIZE: i32 = 100;

/// Validated transfer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub currency: String,
}

/// Transfer service: validates requests, then runs the coordinator
#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn LedgerStore>,
    coordinator: TransferCoordinator,
}

impl TransferService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        let coordinator = TransferCoordinator::new(Arc::clone(&store));
        Self { store, coordinator }
    }

    /// Validate and execute a transfer
    ///
    /// Rejects non-positive amounts, self-transfers, unknown accounts and
    /// accounts whose currency differs from the request's.
    pub async fn create_transfer(
        &self,
        req: TransferRequest,
    ) -> Result<TransferTxResult, LedgerError> {
        info!(
            from = req.from_account_id,
            to = req.to_account_id,
            amount = req.amount,
            currency = %req.currency,
            "Creating transfer"
        );

        if req.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if req.from_account_id == req.to_account_id {
            return Err(LedgerError::SameAccount);
        }

        self.valid_account(req.from_account_id, &req.currency).await?;
        self.valid_account(req.to_account_id, &req.currency).await?;

        self.coordinator
            .execute_transfer(TransferTxParams::new(
                req.from_account_id,
                req.to_account_id,
                req.amount,
            ))
            .await
    }

    async fn valid_account(&self, account_id: i64, currency: &str) -> Result<Account, LedgerError> {
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        if account.currency != currency {
            warn!(
                account_id,
                expected = currency,
                actual = %account.currency,
                "Currency mismatch"
            );
            return Err(LedgerError::CurrencyMismatch {
                account_id,
                expected: currency.to_string(),
                actual: account.currency,
            });
        }

        Ok(account)
    }

    pub async fn get_transfer(&self, id: i64) -> Result<Transfer, LedgerError> {
        self.store
            .get_transfer(id)
            .await?
            .ok_or(LedgerError::TransferNotFound(id))
    }
}

/// Account service: open, read, page and close accounts
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Open an account with a zero balance
    pub async fn create_account(&self, owner: &str, currency: &str) -> Result<Account, LedgerError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(LedgerError::InvalidOwner);
        }
        if !is_supported_currency(currency) {
            return Err(LedgerError::UnsupportedCurrency(currency.to_string()));
        }

        let account = self
            .store
            .create_account(CreateAccountParams {
                owner: owner.to_string(),
                balance: 0,
                currency: currency.to_string(),
            })
            .await?;

        info!(account_id = account.id, owner, currency, "Account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: i64) -> Result<Account, LedgerError> {
        self.store
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// One page of accounts ordered by id (`page_id` starts at 1)
    pub async fn list_accounts(
        &self,
        page_id: i32,
        page_size: i32,
    ) -> Result<Vec<Account>, LedgerError> {
        if page_id < 1 {
            return Err(LedgerError::InvalidPagination(format!(
                "page_id must be >= 1, got {}",
                page_id
            )));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(LedgerError::InvalidPagination(format!(
                "page_size must be within {}..={}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, page_size
            )));
        }

        let limit = page_size as i64;
        let offset = (page_id as i64 - 1) * limit;
        Ok(self.store.list_accounts(limit, offset).await?)
    }

    pub async fn delete_account(&self, id: i64) -> Result<(), LedgerError> {
        if !self.store.delete_account(id).await? {
            return Err(LedgerError::AccountNotFound(id));
        }
        info!(account_id = id, "Account deleted");
        Ok(())
    }

    /// Audit trail of one account
    pub async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>, LedgerError> {
        self.get_account(account_id).await?;
        Ok(self.store.list_entries(account_id).await?)
    }
}
