//! Ledger core
//!
//! Accounts, append-only entries and transfers, and the coordinator that
//! writes one transfer atomically.
//!
//! # Components
//!
//! - [`store`]: `LedgerStore` / `LedgerTx` capability traits
//! - [`postgres`]: PostgreSQL store (production)
//! - [`memory`]: in-memory store with row locks and failure injection
//! - [`coordinator`]: `TransferCoordinator::execute_transfer`
//! - [`service`]: request validation in front of the coordinator
//!
//! # Invariants
//!
//! 1. **Accounting identity**: an account's balance equals the sum of its entries
//! 2. **Two entries per transfer**: `-amount` on the source, `+amount` on the destination
//! 3. **Delta-only balances**: balances change only through `add_account_balance`
//! 4. **Lock order**: balance updates touch the smaller account id first

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use coordinator::TransferCoordinator;
pub use error::{LedgerError, StoreError, TransferStep};
pub use memory::{FailPoint, InMemoryLedgerStore};
pub use models::{
    Account, CreateAccountParams, Entry, SUPPORTED_CURRENCIES, Transfer, TransferTxParams,
    TransferTxResult,
};
pub use postgres::PgLedgerStore;
pub use service::{AccountService, TransferRequest, TransferService};
pub use store::{LedgerStore, LedgerTx};
