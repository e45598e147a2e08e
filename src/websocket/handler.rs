//! WebSocket upgrade handler: one connection per team, fed directly by
//! `EventPublisher` (C14). A later connection for the same team supersedes
//! this one; the read side only watches for the client closing.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;

use crate::core_types::TeamId;
use crate::gateway::state::AppState;
use crate::messages::EventData;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub team_id: TeamId,
}

/// Endpoint: GET /ws?team_id=1001
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, params.team_id, state))
}

async fn handle_socket(socket: WebSocket, team_id: TeamId, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.publisher.connect(team_id);

    // spec.md §4.14/§6: position_snapshot is sent eagerly on connect, ahead
    // of any other event the fresh connection could possibly receive.
    let positions = state.positions.positions_for(team_id);
    state.publisher.publish(team_id, EventData::PositionSnapshot { positions }, chrono::Utc::now().timestamp());

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Ok(json) = serde_json::to_string(&event) else { continue };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }
}
