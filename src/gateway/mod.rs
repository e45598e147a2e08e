//! HTTP/WebSocket gateway: the caller-facing surface over the pipeline.
//! Grounded in the teacher's `run_server`, stripped of auth middleware,
//! Swagger UI, and the account/funding/transfer routes spec.md scopes to
//! an external collaborator (§ Non-goals, "authentication token issuance").

pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;

use crate::websocket::ws_handler;
use state::AppState;

pub async fn run_server(port: u16, state: Arc<AppState>) {
    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/orders", axum::routing::post(handlers::submit_order))
        .route("/orders/cancel", axum::routing::post(handlers::cancel_order))
        .route("/positions", get(handlers::get_positions))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind gateway listener");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "gateway listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "gateway server error");
    }
}
