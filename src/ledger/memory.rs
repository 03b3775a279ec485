//! In-memory Ledger Store
//!
//! Mirrors the PostgreSQL semantics the coordinator relies on:
//! - writes are buffered per unit of work and become visible on commit
//! - `add_account_balance` takes a per-account row lock held until the
//!   unit of work ends (re-entrant within one unit of work)
//! - dropping an unfinished unit of work discards it and releases its locks
//!
//! Failures can be injected at any primitive with [`InMemoryLedgerStore::fail_nth`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::error::StoreError;
use super::models::{Account, CreateAccountParams, Entry, Transfer};
use super::store::{LedgerStore, LedgerTx};

/// Store primitive at which a failure can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateTransfer,
    CreateEntry,
    AddAccountBalance,
    Commit,
    Rollback,
}

impl FailPoint {
    fn as_str(&self) -> &'static str {
        match self {
            FailPoint::CreateTransfer => "create_transfer",
            FailPoint::CreateEntry => "create_entry",
            FailPoint::AddAccountBalance => "add_account_balance",
            FailPoint::Commit => "commit",
            FailPoint::Rollback => "rollback",
        }
    }
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    entries: BTreeMap<i64, Entry>,
    transfers: BTreeMap<i64, Transfer>,
    last_account_id: i64,
    last_entry_id: i64,
    last_transfer_id: i64,
}

impl Tables {
    fn has_history(&self, account_id: i64) -> bool {
        self.entries.values().any(|e| e.account_id == account_id)
            || self
                .transfers
                .values()
                .any(|t| t.from_account_id == account_id || t.to_account_id == account_id)
    }
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    /// Remaining calls before the armed failure fires
    failures: Mutex<HashMap<FailPoint, usize>>,
    balance_log: Mutex<Vec<i64>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut failures = lock(&self.failures);
        if let Some(remaining) = failures.get_mut(&point) {
            *remaining -= 1;
            if *remaining == 0 {
                failures.remove(&point);
                debug!(fail_point = point.as_str(), "Injected store failure");
                return Err(StoreError::Injected(point.as_str().to_string()));
            }
        }
        Ok(())
    }

    /// Row lock of an existing account, None if there is no such account
    fn row_lock(&self, account_id: i64) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let tables = lock(&self.tables);
        if !tables.accounts.contains_key(&account_id) {
            return None;
        }
        Some(
            lock(&self.row_locks)
                .entry(account_id)
                .or_default()
                .clone(),
        )
    }

    #[cfg(test)]
    fn row_lock_count(&self) -> usize {
        lock(&self.row_locks).len()
    }
}

/// Ledger store held entirely in process memory
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th next call of `point` fail (1 = the very next call)
    ///
    /// Fires once, then the primitive behaves normally again.
    pub fn fail_nth(&self, point: FailPoint, n: usize) {
        let n = n.max(1);
        lock(&self.shared.failures).insert(point, n);
    }

    /// Account ids in the order their row locks were taken by balance updates
    pub fn balance_updates(&self) -> Vec<i64> {
        lock(&self.shared.balance_log).clone()
    }

    /// Number of committed (transfers, entries)
    pub fn row_counts(&self) -> (usize, usize) {
        let tables = lock(&self.shared.tables);
        (tables.transfers.len(), tables.entries.len())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(InMemoryLedgerTx {
            shared: Arc::clone(&self.shared),
            transfers: Vec::new(),
            entries: Vec::new(),
            deltas: BTreeMap::new(),
            held: HashMap::new(),
        }))
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let mut tables = lock(&self.shared.tables);
        tables.last_account_id += 1;
        let account = Account {
            id: tables.last_account_id,
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(lock(&self.shared.tables).accounts.get(&id).cloned())
    }

    async fn list_accounts(&self, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError> {
        let tables = lock(&self.shared.tables);
        Ok(tables
            .accounts
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn delete_account(&self, id: i64) -> Result<bool, StoreError> {
        let Some(row) = self.shared.row_lock(id) else {
            return Ok(false);
        };
        // Wait for any unit of work holding the row
        let _guard = row.lock().await;

        let mut tables = lock(&self.shared.tables);
        if !tables.accounts.contains_key(&id) {
            return Ok(false);
        }
        if tables.has_history(id) {
            return Err(StoreError::AccountInUse(id));
        }
        tables.accounts.remove(&id);
        lock(&self.shared.row_locks).remove(&id);
        Ok(true)
    }

    async fn get_transfer(&self, id: i64) -> Result<Option<Transfer>, StoreError> {
        Ok(lock(&self.shared.tables).transfers.get(&id).cloned())
    }

    async fn get_entry(&self, id: i64) -> Result<Option<Entry>, StoreError> {
        Ok(lock(&self.shared.tables).entries.get(&id).cloned())
    }

    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>, StoreError> {
        Ok(lock(&self.shared.tables)
            .entries
            .values()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_transfers(&self, account_id: i64) -> Result<Vec<Transfer>, StoreError> {
        Ok(lock(&self.shared.tables)
            .transfers
            .values()
            .filter(|t| t.from_account_id == account_id || t.to_account_id == account_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Buffered unit of work
///
/// Ids are taken from the shared sequences at write time, so a rolled back
/// unit of work leaves gaps, like a PostgreSQL sequence.
pub struct InMemoryLedgerTx {
    shared: Arc<Shared>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    deltas: BTreeMap<i64, i64>,
    held: HashMap<i64, OwnedMutexGuard<()>>,
}

impl InMemoryLedgerTx {
    fn pending_delta(&self, account_id: i64) -> i64 {
        self.deltas.get(&account_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.shared.check(FailPoint::CreateTransfer)?;

        let mut tables = lock(&self.shared.tables);
        for id in [from_account_id, to_account_id] {
            if !tables.accounts.contains_key(&id) {
                return Err(StoreError::AccountNotFound(id));
            }
        }
        tables.last_transfer_id += 1;
        let transfer = Transfer {
            id: tables.last_transfer_id,
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        self.shared.check(FailPoint::CreateEntry)?;

        let mut tables = lock(&self.shared.tables);
        if !tables.accounts.contains_key(&account_id) {
            return Err(StoreError::AccountNotFound(account_id));
        }
        tables.last_entry_id += 1;
        let entry = Entry {
            id: tables.last_entry_id,
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn add_account_balance(
        &mut self,
        account_id: i64,
        delta: i64,
    ) -> Result<Account, StoreError> {
        self.shared.check(FailPoint::AddAccountBalance)?;

        if !self.held.contains_key(&account_id) {
            let row = self
                .shared
                .row_lock(account_id)
                .ok_or(StoreError::AccountNotFound(account_id))?;
            let guard = row.lock_owned().await;
            self.held.insert(account_id, guard);
            lock(&self.shared.balance_log).push(account_id);
        }

        // Committed balance is stable while we hold the row lock
        let mut account = lock(&self.shared.tables)
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(account_id))?;

        let pending = self
            .pending_delta(account_id)
            .checked_add(delta)
            .ok_or(StoreError::BalanceOverflow(account_id))?;
        account.balance = account
            .balance
            .checked_add(pending)
            .ok_or(StoreError::BalanceOverflow(account_id))?;
        self.deltas.insert(account_id, pending);
        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        let pending = self.pending_delta(id);
        let Some(mut account) = lock(&self.shared.tables).accounts.get(&id).cloned() else {
            return Ok(None);
        };
        account.balance = account
            .balance
            .checked_add(pending)
            .ok_or(StoreError::BalanceOverflow(id))?;
        Ok(Some(account))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.shared.check(FailPoint::Commit)?;

        let mut tables = lock(&self.shared.tables);
        // Check every new balance before touching any row
        let mut balances = Vec::with_capacity(self.deltas.len());
        for (&account_id, &delta) in &self.deltas {
            let account = tables
                .accounts
                .get(&account_id)
                .ok_or(StoreError::AccountNotFound(account_id))?;
            let balance = account
                .balance
                .checked_add(delta)
                .ok_or(StoreError::BalanceOverflow(account_id))?;
            balances.push((account_id, balance));
        }
        for (account_id, balance) in balances {
            if let Some(account) = tables.accounts.get_mut(&account_id) {
                account.balance = balance;
            }
        }
        for transfer in &self.transfers {
            tables.transfers.insert(transfer.id, transfer.clone());
        }
        for entry in &self.entries {
            tables.entries.insert(entry.id, entry.clone());
        }
        // Row locks are released when `self` drops, after the tables guard
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.shared.check(FailPoint::Rollback)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn open(store: &InMemoryLedgerStore, balance: i64) -> Account {
        store
            .create_account(CreateAccountParams {
                owner: "alice".to_string(),
                balance,
                currency: "USD".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_writes_invisible_until_commit() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 100).await;

        let mut tx = store.begin().await.unwrap();
        let entry = tx.create_entry(a.id, 25).await.unwrap();
        let updated = tx.add_account_balance(a.id, 25).await.unwrap();
        assert_eq!(updated.balance, 125);

        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 100);
        assert!(store.get_entry(entry.id).await.unwrap().is_none());

        tx.commit().await.unwrap();

        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 125);
        assert_eq!(store.get_entry(entry.id).await.unwrap().unwrap().amount, 25);
    }

    #[tokio::test]
    async fn test_drop_discards_work() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 100).await;
        let b = open(&store, 100).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_transfer(a.id, b.id, 10).await.unwrap();
            tx.add_account_balance(a.id, -10).await.unwrap();
        }

        assert_eq!(store.row_counts(), (0, 0));
        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 100);

        // Lock released by the drop
        let mut tx = store.begin().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), tx.add_account_balance(a.id, 1))
            .await
            .expect("row lock should be free")
            .unwrap();
    }

    #[tokio::test]
    async fn test_row_lock_blocks_second_writer() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 0).await;

        let mut first = store.begin().await.unwrap();
        first.add_account_balance(a.id, 5).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), second.add_account_balance(a.id, 7))
                .await;
        assert!(blocked.is_err(), "second writer must wait for the row lock");

        first.commit().await.unwrap();
        let updated = second.add_account_balance(a.id, 7).await.unwrap();
        assert_eq!(updated.balance, 12);
        second.commit().await.unwrap();
        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 12);
    }

    #[tokio::test]
    async fn test_row_lock_is_reentrant_within_tx() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 50).await;

        let mut tx = store.begin().await.unwrap();
        tx.add_account_balance(a.id, 10).await.unwrap();
        let again = tokio::time::timeout(Duration::from_secs(1), tx.add_account_balance(a.id, -10))
            .await
            .expect("same unit of work must not block on its own lock")
            .unwrap();
        assert_eq!(again.balance, 50);
        tx.commit().await.unwrap();
        assert_eq!(store.balance_updates(), vec![a.id]);
    }

    #[tokio::test]
    async fn test_fail_nth_fires_once() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 0).await;
        store.fail_nth(FailPoint::CreateEntry, 2);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.create_entry(a.id, 1).await.is_ok());
        assert!(matches!(
            tx.create_entry(a.id, 1).await,
            Err(StoreError::Injected(_))
        ));
        assert!(tx.create_entry(a.id, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let store = InMemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.add_account_balance(99, 1).await,
            Err(StoreError::AccountNotFound(99))
        ));
        assert!(matches!(
            tx.create_entry(99, 1).await,
            Err(StoreError::AccountNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_delete_account_with_history_rejected() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 0).await;
        let b = open(&store, 0).await;

        let mut tx = store.begin().await.unwrap();
        tx.create_entry(a.id, 3).await.unwrap();
        tx.add_account_balance(a.id, 3).await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(
            store.delete_account(a.id).await,
            Err(StoreError::AccountInUse(_))
        ));
        assert!(store.delete_account(b.id).await.unwrap());
        assert!(!store.delete_account(b.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_tx_read_includes_pending_delta() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 100).await;
        let b = open(&store, 100).await;

        let mut tx = store.begin().await.unwrap();
        tx.add_account_balance(a.id, -30).await.unwrap();
        tx.add_account_balance(a.id, 5).await.unwrap();

        let inside = tx.get_account(a.id).await.unwrap().unwrap();
        assert_eq!(inside.balance, 75);
        // Untouched row reads the committed balance
        assert_eq!(tx.get_account(b.id).await.unwrap().unwrap().balance, 100);
        assert!(tx.get_account(99).await.unwrap().is_none());
        // Outside the unit of work nothing changed yet
        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 100);

        tx.rollback().await.unwrap();
        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_balance_overflow_is_an_error() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, i64::MAX - 5).await;

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.add_account_balance(a.id, 10).await,
            Err(StoreError::BalanceOverflow(id)) if id == a.id
        ));
        // The failed delta is not kept
        assert_eq!(tx.get_account(a.id).await.unwrap().unwrap().balance, i64::MAX - 5);
        assert_eq!(tx.add_account_balance(a.id, 5).await.unwrap().balance, i64::MAX);
        tx.commit().await.unwrap();
        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, i64::MAX);
    }

    #[tokio::test]
    async fn test_row_locks_only_for_existing_accounts() {
        let store = InMemoryLedgerStore::new();
        let a = open(&store, 0).await;

        assert!(!store.delete_account(1234).await.unwrap());
        let mut tx = store.begin().await.unwrap();
        assert!(tx.add_account_balance(5678, 1).await.is_err());
        drop(tx);
        assert_eq!(store.shared.row_lock_count(), 0);

        let mut tx = store.begin().await.unwrap();
        tx.add_account_balance(a.id, 1).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.shared.row_lock_count(), 1);

        assert!(store.delete_account(a.id).await.unwrap());
        assert_eq!(store.shared.row_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_list_accounts_paging() {
        let store = InMemoryLedgerStore::new();
        for _ in 0..7 {
            open(&store, 0).await;
        }
        let page = store.list_accounts(5, 5).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![6, 7]);
    }
}
