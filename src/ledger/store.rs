//! Ledger Store capability traits
//!
//! The coordinator and services depend only on these traits. Two
//! implementations exist: [`PgLedgerStore`](super::PgLedgerStore) and
//! [`InMemoryLedgerStore`](super::InMemoryLedgerStore).

use async_trait::async_trait;

use super::error::StoreError;
use super::models::{Account, CreateAccountParams, Entry, Transfer};

/// Durable record of accounts, entries and transfers
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Get store name for logging
    fn name(&self) -> &'static str;

    /// Open a unit of work
    ///
    /// May block waiting for a pooled connection. Dropping the returned
    /// handle without calling [`LedgerTx::commit`] rolls the work back.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError>;

    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError>;

    /// Accounts ordered by id
    async fn list_accounts(&self, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError>;

    /// Returns false if no such account existed
    ///
    /// Fails with [`StoreError::AccountInUse`] while entries or transfers
    /// still reference the account.
    async fn delete_account(&self, id: i64) -> Result<bool, StoreError>;

    async fn get_transfer(&self, id: i64) -> Result<Option<Transfer>, StoreError>;

    async fn get_entry(&self, id: i64) -> Result<Option<Entry>, StoreError>;

    /// Entries of one account ordered by id
    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>, StoreError>;

    /// Transfers in which the account is source or destination, ordered by id
    async fn list_transfers(&self, account_id: i64) -> Result<Vec<Transfer>, StoreError>;

    /// Check store health
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Transaction-bound handle exposing the write primitives
///
/// Every call runs inside the same unit of work. Nothing written through
/// the handle is visible to other callers before `commit` returns.
#[async_trait]
pub trait LedgerTx: Send {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError>;

    /// Atomically add `delta` to the balance and return the updated row
    ///
    /// Takes the account's row lock, held until the unit of work ends.
    async fn add_account_balance(
        &mut self,
        account_id: i64,
        delta: i64,
    ) -> Result<Account, StoreError>;

    async fn get_account(&mut self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
