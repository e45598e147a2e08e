//! Order submit/cancel handlers: register with C13, hand off to C8, block
//! the calling task on the coordinator until the pipeline completes or
//! times out.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::coordinator::RequestStatus;
use crate::messages::IntakeMessage;
use crate::models::OrderType;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, CancelOrderRequest, NewOrderRequest, OrderResponseData, ok};

fn wall_clock_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// POST /orders
pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewOrderRequest>,
) -> ApiResult<OrderResponseData> {
    // Input error (spec.md §7): missing required field, caller's fault — rejected
    // before the request is even registered with the coordinator.
    if req.order_type == OrderType::Limit && req.price.is_none() {
        return ApiError::missing_price("limit orders require a price").into_err();
    }

    let registration = state
        .register_request(req.team_id)
        .map_err(|_| ApiError::service_unavailable("too many pending requests"))?;

    let order_id = state.next_order_id();
    let role = req.role.clone();
    let order = req.into_order(order_id, wall_clock_now());

    state.coordinator.update_status(registration.request_id, RequestStatus::Pending);

    let message = IntakeMessage::NewOrder { order, role, request_id: registration.request_id };
    if state.intake_tx.send(message).is_err() {
        return ApiError::service_unavailable("intake queue is closed").into_err();
    }

    let coordinator = state.coordinator.clone();
    let request_id = registration.request_id;
    let timeout = state.default_timeout;
    let outcome = tokio::task::spawn_blocking(move || coordinator.wait_for_completion(request_id, timeout))
        .await
        .map_err(|_| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, crate::gateway::types::error_codes::INTERNAL_ERROR, format!("coordinator task panicked (request {request_id})")))?;

    ok(OrderResponseData::from(outcome))
}

/// POST /orders/cancel
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelOrderRequest>,
) -> ApiResult<OrderResponseData> {
    let registration = state
        .register_request(req.team_id)
        .map_err(|_| ApiError::service_unavailable("too many pending requests"))?;

    state.coordinator.update_status(registration.request_id, RequestStatus::Pending);

    let message = IntakeMessage::CancelOrder {
        instrument_id: req.instrument_id,
        order_id: req.order_id,
        team_id: req.team_id,
        request_id: registration.request_id,
    };
    if state.intake_tx.send(message).is_err() {
        return ApiError::service_unavailable("intake queue is closed").into_err();
    }

    let coordinator = state.coordinator.clone();
    let request_id = registration.request_id;
    let timeout = state.default_timeout;
    let outcome = tokio::task::spawn_blocking(move || coordinator.wait_for_completion(request_id, timeout))
        .await
        .map_err(|_| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, crate::gateway::types::error_codes::INTERNAL_ERROR, format!("coordinator task panicked (request {request_id})")))?;

    ok(OrderResponseData::from(outcome))
}
