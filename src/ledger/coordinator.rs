//! Transfer Coordinator
//!
//! Runs one money transfer as a single unit of work:
//!
//! ```text
//! BEGIN
//!   INSERT transfer (from, to, amount)
//!   INSERT entry    (from, -amount)
//!   INSERT entry    (to,   +amount)
//!   UPDATE balance  (min(from, to))      -- row lock #1
//!   UPDATE balance  (max(from, to))      -- row lock #2
//! COMMIT
//! ```
//!
//! # Lock Ordering
//!
//! Balance updates always go to the numerically smaller account id first,
//! whatever the transfer direction. Two concurrent transfers over the same
//! pair of accounts therefore take their row locks in the same order and
//! cannot wait on each other in a cycle. Do not reorder.
//!
//! Inputs are not validated here (see [`TransferService`](super::TransferService)).

use std::sync::Arc;

use tracing::{debug, error, info};

use super::error::{LedgerError, StoreError, TransferStep};
use super::models::{Account, Entry, Transfer, TransferTxParams, TransferTxResult};
use super::store::{LedgerStore, LedgerTx};

/// Transfer Coordinator - executes transfers atomically
#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<dyn LedgerStore>,
}

/// Rows written by the unit of work, before commit
struct Written {
    transfer: Transfer,
    from_entry: Entry,
    to_entry: Entry,
    from_account: Account,
    to_account: Account,
}

type StepResult<T> = Result<T, (TransferStep, StoreError)>;

impl TransferCoordinator {
    /// Create a coordinator over a shared store
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute a transfer
    ///
    /// Either everything (1 transfer, 2 entries, 2 balance updates) is
    /// committed or nothing is. If the rollback after a failure also fails
    /// the error is [`LedgerError::AbortFailed`] and the outcome is unknown.
    pub async fn execute_transfer(
        &self,
        params: TransferTxParams,
    ) -> Result<TransferTxResult, LedgerError> {
        let TransferTxParams {
            from_account_id: from,
            to_account_id: to,
            amount,
        } = params;
        debug!(from, to, amount, store = self.store.name(), "Transfer begin");

        let mut tx = self.store.begin().await.map_err(|source| {
            error!(from, to, amount, "Failed to begin transaction: {}", source);
            LedgerError::Persistence {
                step: TransferStep::Begin,
                source,
            }
        })?;

        let written = match Self::write_all(tx.as_mut(), params).await {
            Ok(written) => written,
            Err((step, source)) => return Err(Self::abort(tx, params, step, source).await),
        };

        if let Err(source) = tx.commit().await {
            error!(from, to, amount, "Failed to commit transfer: {}", source);
            return Err(LedgerError::Persistence {
                step: TransferStep::Commit,
                source,
            });
        }

        info!(
            transfer_id = written.transfer.id,
            from,
            to,
            amount,
            from_balance = written.from_account.balance,
            to_balance = written.to_account.balance,
            "Transfer committed"
        );

        Ok(TransferTxResult {
            transfer: written.transfer,
            from_account: written.from_account,
            to_account: written.to_account,
            from_entry: written.from_entry,
            to_entry: written.to_entry,
        })
    }

    /// Steps 1-5 inside the open unit of work
    async fn write_all(tx: &mut dyn LedgerTx, params: TransferTxParams) -> StepResult<Written> {
        let TransferTxParams {
            from_account_id: from,
            to_account_id: to,
            amount,
        } = params;

        let transfer = tx
            .create_transfer(from, to, amount)
            .await
            .map_err(|e| (TransferStep::CreateTransfer, e))?;

        let from_entry = tx
            .create_entry(from, -amount)
            .await
            .map_err(|e| (TransferStep::CreateFromEntry, e))?;

        let to_entry = tx
            .create_entry(to, amount)
            .await
            .map_err(|e| (TransferStep::CreateToEntry, e))?;

        let (from_account, to_account) = if from < to {
            let (from_account, to_account) = add_money(tx, from, -amount, to, amount).await?;
            (from_account, to_account)
        } else {
            let (to_account, from_account) = add_money(tx, to, amount, from, -amount).await?;
            (from_account, to_account)
        };

        // Self-transfer: both updates hit one row, report its final state twice
        let to_account = if from == to {
            from_account.clone()
        } else {
            to_account
        };

        Ok(Written {
            transfer,
            from_entry,
            to_entry,
            from_account,
            to_account,
        })
    }

    /// Roll back after a failed step and build the reported error
    async fn abort(
        tx: Box<dyn LedgerTx>,
        params: TransferTxParams,
        step: TransferStep,
        source: StoreError,
    ) -> LedgerError {
        match tx.rollback().await {
            Ok(()) => {
                error!(
                    from = params.from_account_id,
                    to = params.to_account_id,
                    amount = params.amount,
                    %step,
                    "Transfer rolled back: {}",
                    source
                );
                LedgerError::Persistence { step, source }
            }
            Err(rollback) => {
                error!(
                    from = params.from_account_id,
                    to = params.to_account_id,
                    amount = params.amount,
                    %step,
                    "Transfer failed and rollback failed: {}; rollback: {}",
                    source,
                    rollback
                );
                LedgerError::AbortFailed {
                    step,
                    source,
                    rollback,
                }
            }
        }
    }
}

/// Apply two balance deltas in the given order
async fn add_money(
    tx: &mut dyn LedgerTx,
    account_id1: i64,
    amount1: i64,
    account_id2: i64,
    amount2: i64,
) -> StepResult<(Account, Account)> {
    let account1 = tx
        .add_account_balance(account_id1, amount1)
        .await
        .map_err(|e| (TransferStep::AddBalance(account_id1), e))?;

    let account2 = tx
        .add_account_balance(account_id2, amount2)
        .await
        .map_err(|e| (TransferStep::AddBalance(account_id2), e))?;

    Ok((account1, account2))
}
