// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws` — the push channel. Upgrades to a websocket, sends an initial
//! `snapshot` envelope matching `/api/status`, then flushes each connected
//! subscriber's batched queue every `BATCH_WINDOW_MS` until it disconnects
//! or goes idle past `IDLE_DISCONNECT_MS`.

use aleph_core::{effective_max_attempts, Clock};
use aleph_engine::aggregate;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{info, warn};

use super::AppState;

/// Random suffix length for subscriber session ids, matching the job id
/// scheme's own random-suffix convention.
const SESSION_ID_LEN: usize = 12;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let session_id = nanoid::nanoid!(SESSION_ID_LEN);
    let connected_at = state.clock.epoch_ms();
    let subscriber = state.broadcaster.register(session_id.clone(), connected_at);

    let snapshot = match aggregate(
        &state.registry,
        state.store.as_ref(),
        &state.scheduler.pending_retry_attempts(),
        effective_max_attempts(None),
        state.broadcaster.subscriber_count(),
        connected_at,
    )
    .await
    {
        Ok(status) => json!({ "event": "snapshot", "data": status, "timestamp": connected_at }),
        Err(err) => {
            warn!(session_id, error = %err, "failed to build websocket snapshot");
            state.broadcaster.unregister(&session_id);
            return;
        }
    };

    if socket.send(Message::Text(snapshot.to_string())).await.is_err() {
        state.broadcaster.unregister(&session_id);
        return;
    }

    loop {
        tokio::select! {
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            _ = subscriber.wait_for_batch() => {
                let events = subscriber.drain();
                let now = state.clock.epoch_ms();
                if !events.is_empty() {
                    let envelope = json!({ "event": "batch", "data": events, "timestamp": now });
                    if socket.send(Message::Text(envelope.to_string())).await.is_err() {
                        break;
                    }
                    subscriber.mark_flushed(now);
                } else if subscriber.is_idle(now) {
                    info!(session_id, "disconnecting idle push subscriber");
                    break;
                }
            }
        }
    }

    state.broadcaster.unregister(&session_id);
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
