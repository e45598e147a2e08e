//! API response envelope and error codes (spec.md §6 "Caller API").
//!
//! `code: 0` is success; any other value is one of the stable error codes
//! spec.md §6 lists by name. Business rejections (a constraint violation,
//! a failed cancel) still arrive as HTTP 200 with `success=false` inside
//! the envelope, per spec.md §7 — only transport and capacity failures get
//! a non-2xx status.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { code: 0, msg: "ok".to_string(), data: Some(data) }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse { code, msg: msg.into(), data: None }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

#[inline]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_ORDER, msg)
    }

    pub fn missing_price(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::MISSING_PRICE, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error_codes::SERVICE_OVERLOADED, msg)
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err((self.status, Json(ApiResponse::<()>::error(self.code, self.message))))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.message))).into_response()
    }
}

/// Order submit/cancel response data, shaped directly from the coordinator's
/// `ApiOutcome` (spec.md §6's "response envelope").
#[derive(Debug, Serialize)]
pub struct OrderResponseData {
    pub success: bool,
    pub request_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<crate::coordinator::ApiOutcome> for OrderResponseData {
    fn from(outcome: crate::coordinator::ApiOutcome) -> Self {
        Self {
            success: outcome.success,
            request_id: outcome.request_id,
            order_id: outcome.order_id,
            error_code: outcome.error_code,
            error_message: outcome.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PositionsResponseData {
    pub positions: Vec<PositionEntry>,
}

#[derive(Debug, Serialize)]
pub struct PositionEntry {
    pub instrument_id: u32,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponseData {
    pub status: &'static str,
    pub timestamp: i64,
    pub pending_requests: usize,
}

/// Numeric codes for the transport envelope's `code` field — these identify
/// the HTTP-adjacent failure class (malformed input, overload, internal
/// fault) for errors raised before a request reaches the pipeline. They are
/// distinct from the business-level `error_code` strings (`POSITION_LIMIT_EXCEEDED`,
/// `MARKET_CLOSED`, ...) that `ApiOutcome`/`OrderResponseData` carry, which
/// come from `venue.rs`/`validator.rs`/the coordinator rather than this table.
pub mod error_codes {
    pub const MISSING_PRICE: i32 = 1001;
    pub const INVALID_ORDER: i32 = 1003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_OVERLOADED: i32 = 5001;
}
