use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bubbles_shared::protocol::{ClientMsg, ServerMsg};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot, OwnedSemaphorePermit, Semaphore};

use crate::relay::{RelayBroadcast, RelayCommand};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub relay_tx: mpsc::Sender<RelayCommand>,
    pub broadcast_tx: broadcast::Sender<RelayBroadcast>,
    pub connection_semaphore: Arc<Semaphore>,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let Ok(permit) = app_state.connection_semaphore.clone().try_acquire_owned() else {
        tracing::warn!("Connection limit reached, rejecting upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, permit))
}

async fn handle_socket(socket: WebSocket, app_state: AppState, _permit: OwnedSemaphorePermit) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before joining so no broadcast between init and the loop is lost
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .relay_tx
        .send(RelayCommand::Connect { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }

    let (my_id, init) = match resp_rx.await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("Failed to receive init");
            return;
        }
    };

    tracing::info!("User {} connected", my_id);

    let mut alive = send_msg(&mut sink, &ServerMsg::InitUser(init)).await;

    while alive {
        tokio::select! {
            // Client -> Relay
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(client_msg) => {
                                let cmd = RelayCommand::Client { id: my_id.clone(), msg: client_msg };
                                if app_state.relay_tx.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::debug!("Ignoring malformed message from {}: {}", my_id, e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Relay -> Client
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        if broadcast.origin == my_id {
                            continue;
                        }
                        alive = send_msg(&mut sink, &broadcast.msg).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("User {} lagged by {} messages", my_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .relay_tx
        .send(RelayCommand::Disconnect { id: my_id.clone() })
        .await;
    tracing::info!("User {} disconnected", my_id);
}

/// Returns false once the socket can no longer be written to.
async fn send_msg<S>(sink: &mut S, msg: &ServerMsg) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode {:?}: {}", msg, e);
            true
        }
    }
}
