use crate::state::{Audience, Dispatch, WorldState};
use axum::extract::ws::Utf8Bytes;
use sandbox_shared::protocol::{ClientMsg, ConnectionId};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from client connections to the world loop
#[derive(Debug)]
pub enum WorldCommand {
    Connect {
        response: oneshot::Sender<ConnectionId>,
    },
    Client {
        id: ConnectionId,
        msg: ClientMsg,
    },
    Disconnect {
        id: ConnectionId,
    },
    /// The connection's broadcast receiver lagged and dropped messages
    Resync {
        id: ConnectionId,
    },
}

/// A serialized message fanned out to connection tasks. Each task forwards it
/// only if its own id is in the audience.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub text: Utf8Bytes,
}

/// Run the world loop. Owns the authoritative world state and applies
/// commands strictly one at a time.
pub async fn run_world_loop(
    mut cmd_rx: mpsc::Receiver<WorldCommand>,
    outbound_tx: broadcast::Sender<Outbound>,
) {
    let mut state = WorldState::new();

    while let Some(cmd) = cmd_rx.recv().await {
        let dispatches = match cmd {
            WorldCommand::Connect { response } => {
                let id = state.connect();
                if response.send(id.clone()).is_err() {
                    // Connection task went away before learning its id
                    state.disconnect(&id)
                } else {
                    tracing::debug!("Connection {} opened", id);
                    Vec::new()
                }
            }
            WorldCommand::Client { id, msg } => state.handle(&id, msg),
            WorldCommand::Resync { id } => state.resync(&id),
            WorldCommand::Disconnect { id } => {
                let out = state.disconnect(&id);
                tracing::info!(
                    "Connection {} closed, {} players remain",
                    id,
                    state.players.len()
                );
                out
            }
        };

        for dispatch in dispatches {
            publish(&outbound_tx, dispatch);
        }
    }

    tracing::info!("World loop ended");
}

fn publish(outbound_tx: &broadcast::Sender<Outbound>, dispatch: Dispatch) {
    let text = match serde_json::to_string(&dispatch.msg) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", dispatch.msg, e);
            return;
        }
    };
    // No receivers just means nobody is connected
    let _ = outbound_tx.send(Outbound {
        audience: dispatch.audience,
        text: text.into(),
    });
}
