use std::sync::Arc;

use crate::ledger::{AccountService, LedgerStore, TransferService};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub accounts: AccountService,
    pub transfers: TransferService,
}

impl AppState {
    /// Build services over one shared store
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(&store)),
            transfers: TransferService::new(Arc::clone(&store)),
            store,
        }
    }
}
