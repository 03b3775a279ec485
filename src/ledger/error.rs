//! Ledger Error Types
//!
//! Two layers:
//! - [`StoreError`]: a single store primitive failed
//! - [`LedgerError`]: what callers of the coordinator and services see

use std::fmt;

use thiserror::Error;

/// Failure of one Ledger Store primitive
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Account {0} still has ledger history")]
    AccountInUse(i64),

    #[error("Balance of account {0} out of range")]
    BalanceOverflow(i64),

    /// Raised by the in-memory store when a failure was injected
    #[error("Injected failure at {0}")]
    Injected(String),
}

/// Step of the transfer unit of work, used as error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Begin,
    CreateTransfer,
    CreateFromEntry,
    CreateToEntry,
    AddBalance(i64),
    Commit,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStep::Begin => write!(f, "begin transaction"),
            TransferStep::CreateTransfer => write!(f, "create transfer"),
            TransferStep::CreateFromEntry => write!(f, "create from entry"),
            TransferStep::CreateToEntry => write!(f, "create to entry"),
            TransferStep::AddBalance(id) => write!(f, "update balance of account {}", id),
            TransferStep::Commit => write!(f, "commit transaction"),
        }
    }
}

/// Ledger error types
#[derive(Error, Debug)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Source and destination accounts are the same")]
    SameAccount,

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Owner must not be empty")]
    InvalidOwner,

    #[error("Account [{account_id}] currency mismatch: {actual} vs {expected}")]
    CurrencyMismatch {
        account_id: i64,
        expected: String,
        actual: String,
    },

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    // === Lookup Errors ===
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Transfer not found: {0}")]
    TransferNotFound(i64),

    #[error("Entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Account {0} cannot be deleted while it has ledger history")]
    AccountInUse(i64),

    // === Persistence Errors ===
    /// The unit of work failed at `step` and was rolled back
    #[error("Failed to {step}: {source}")]
    Persistence {
        step: TransferStep,
        #[source]
        source: StoreError,
    },

    /// The unit of work failed and so did the rollback; outcome unknown
    #[error("tx error: failed to {step}: {source}, rb error: {rollback}")]
    AbortFailed {
        step: TransferStep,
        #[source]
        source: StoreError,
        rollback: StoreError,
    },

    /// Store failure outside a transfer (reads, account CRUD)
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound(id) => LedgerError::AccountNotFound(id),
            StoreError::AccountInUse(id) => LedgerError::AccountInUse(id),
            other => LedgerError::Store(other),
        }
    }
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::SameAccount => "SAME_ACCOUNT",
            LedgerError::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            LedgerError::InvalidOwner => "INVALID_OWNER",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::InvalidPagination(_) => "INVALID_PAGINATION",
            LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LedgerError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            LedgerError::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            LedgerError::AccountInUse(_) => "ACCOUNT_IN_USE",
            LedgerError::Persistence { .. } => "PERSISTENCE_ERROR",
            LedgerError::AbortFailed { .. } => "ABORT_FAILED",
            LedgerError::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::SameAccount
            | LedgerError::UnsupportedCurrency(_)
            | LedgerError::InvalidOwner
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::InvalidPagination(_) => 400,
            LedgerError::AccountNotFound(_)
            | LedgerError::TransferNotFound(_)
            | LedgerError::EntryNotFound(_) => 404,
            LedgerError::AccountInUse(_) => 409,
            LedgerError::Persistence { .. }
            | LedgerError::AbortFailed { .. }
            | LedgerError::Store(_) => 500,
        }
    }

    /// True when the store may hold a partially applied transfer
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, LedgerError::AbortFailed { .. })
    }
}
