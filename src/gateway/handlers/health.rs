//! Health check handler.
//!
//! No external dependency to probe — the pipeline's own pending-request
//! count is the only interesting signal to expose.

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiResult, HealthResponseData, ok};

pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponseData> {
    ok(HealthResponseData {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp(),
        pending_requests: state.coordinator.pending_count(),
    })
}
