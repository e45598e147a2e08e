//! Position query handler (spec.md §6 "query positions").

use std::sync::Arc;

use axum::extract::{Query, State};

use super::super::state::AppState;
use super::super::types::{ApiResult, PositionEntry, PositionsQuery, PositionsResponseData, ok};

pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PositionsQuery>,
) -> ApiResult<PositionsResponseData> {
    let positions = state
        .positions
        .positions_for(params.team_id)
        .into_iter()
        .map(|(instrument_id, quantity)| PositionEntry { instrument_id, quantity })
        .collect();
    ok(PositionsResponseData { positions })
}
