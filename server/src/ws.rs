use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use sandbox_shared::protocol::{ClientMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::world_loop::{Outbound, WorldCommand};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub world_tx: mpsc::Sender<WorldCommand>,
    pub outbound_tx: broadcast::Sender<Outbound>,
    pub max_message_bytes: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before joining so nothing addressed to us is missed
    let mut outbound_rx = app_state.outbound_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .world_tx
        .send(WorldCommand::Connect { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }

    let my_id = match resp_rx.await {
        Ok(id) => id,
        Err(_) => {
            tracing::error!("Failed to receive connection id");
            return;
        }
    };

    tracing::info!("Connection {} opened", my_id);

    let welcome = ServerMsg::Welcome(WelcomeMsg {
        protocol_version: PROTOCOL_VERSION,
        self_id: my_id.clone(),
    });
    let welcome_sent = match serde_json::to_string(&welcome) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize welcome: {}", e);
            false
        }
    };

    if welcome_sent {
        loop {
            tokio::select! {
                // Client -> Server
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if text.as_str().len() > app_state.max_message_bytes {
                                tracing::warn!(
                                    "Dropping {} byte frame from {}",
                                    text.as_str().len(),
                                    my_id
                                );
                                continue;
                            }
                            match serde_json::from_str::<ClientMsg>(text.as_str()) {
                                Ok(client_msg) => {
                                    let cmd = WorldCommand::Client {
                                        id: my_id.clone(),
                                        msg: client_msg,
                                    };
                                    if app_state.world_tx.send(cmd).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!("Unparseable frame from {}: {}", my_id, e);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!("Connection {} errored: {}", my_id, e);
                            break;
                        }
                        _ => {} // Ignore ping/pong/binary
                    }
                }

                // Server -> Client
                result = outbound_rx.recv() => {
                    match result {
                        Ok(outbound) => {
                            if !outbound.audience.includes(&my_id) {
                                continue;
                            }
                            if sink.send(Message::Text(outbound.text)).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Skipped messages may include roster deltas; ask for a snapshot
                            tracing::warn!("Connection {} lagged by {} messages, resyncing", my_id, n);
                            let cmd = WorldCommand::Resync { id: my_id.clone() };
                            if app_state.world_tx.send(cmd).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .world_tx
        .send(WorldCommand::Disconnect { id: my_id.clone() })
        .await;
    tracing::info!("Connection {} closed", my_id);
}
