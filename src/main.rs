//! simple_bank - HTTP ledger service
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌─────────────┐    ┌──────────────┐
//! │  Config  │───▶│ Gateway  │───▶│  Services   │───▶│ Ledger Store │
//! │  (YAML)  │    │  (axum)  │    │(Coordinator)│    │ (PG / memory)│
//! └──────────┘    └──────────┘    └─────────────┘    └──────────────┘
//! ```
//!
//! Flags: `--env/-e <name>` selects `config/<name>.yaml`, `--port <n>`
//! overrides the listen port, `--memory` forces the in-memory store.

use std::sync::Arc;

use anyhow::Context;

use simple_bank::config::{AppConfig, StoreKind};
use simple_bank::db::Database;
use simple_bank::gateway::{run_server, state::AppState};
use simple_bank::ledger::{InMemoryLedgerStore, LedgerStore, PgLedgerStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn use_memory_store() -> bool {
    std::env::args().any(|a| a == "--memory")
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LedgerStore>> {
    match config.store {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory ledger store, data is lost on exit");
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        StoreKind::Postgres => {
            let db = Database::connect(&config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.health_check()
                .await
                .context("PostgreSQL health check failed")?;
            db.ensure_schema()
                .await
                .context("Failed to initialize ledger schema")?;
            Ok(Arc::new(PgLedgerStore::new(db.pool().clone())))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.server.port = port;
    }
    if use_memory_store() {
        config.store = StoreKind::Memory;
    }

    let _log_guard = simple_bank::logging::init_logging(&config);
    tracing::info!(
        env = %env,
        version = env!("GIT_HASH"),
        store = ?config.store,
        "Starting simple_bank"
    );

    let store = open_store(&config).await?;
    let state = AppState::new(store);

    run_server(state, &config.server_address()).await
}
