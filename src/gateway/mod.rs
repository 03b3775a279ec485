pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use state::AppState;

/// Build the HTTP router over shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route(
            "/api/v1/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route(
            "/api/v1/accounts/{id}",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        .route("/api/v1/accounts/{id}/entries", get(handlers::list_entries))
        .route("/api/v1/transfers", post(handlers::create_transfer))
        .route("/api/v1/transfers/{id}", get(handlers::get_transfer))
        .with_state(state)
}

/// Bind `addr` and serve until the server fails
pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let store = state.store.name();
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        anyhow::anyhow!("failed to bind {}: {}", addr, e)
    })?;

    tracing::info!(addr, store, "Gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}
