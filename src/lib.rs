//! simple_bank - Minimal Banking Ledger
//!
//! Accounts, append-only entries and money transfers, where every transfer
//! is written as one atomic unit of work with deadlock-free lock ordering.
//!
//! # Modules
//!
//! - [`ledger`] - Models, store traits, stores, transfer coordinator, services
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`gateway`] - HTTP API (axum)
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;

// Convenient re-exports at crate root
pub use config::{AppConfig, StoreKind};
pub use ledger::{
    Account, Entry, InMemoryLedgerStore, LedgerError, LedgerStore, LedgerTx, PgLedgerStore,
    Transfer, TransferCoordinator, TransferTxParams, TransferTxResult,
};
