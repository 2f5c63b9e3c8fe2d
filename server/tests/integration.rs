//! Integration tests for the bubbles relay.
//!
//! These tests start a real relay instance and connect via WebSocket
//! to verify end-to-end behavior.

use std::sync::Arc;
use std::time::Duration;

use bubbles_shared::protocol::{ClientMsg, ServerMsg, UserMsg, PROTOCOL_VERSION};
use bubbles_shared::user::UserState;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Start a relay on a random available port and return the WebSocket URL.
async fn start_test_server(max_connections: usize) -> String {
    use bubbles_server::config::ServerConfig;
    use bubbles_server::relay::{run_relay, RelayBroadcast, RelayCommand};
    use bubbles_server::ws::{ws_handler, AppState};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig {
        listen_addr: addr.to_string(),
        max_connections,
        rng_seed: Some(12345),
        ..Default::default()
    };

    let (relay_tx, relay_rx) = mpsc::channel::<RelayCommand>(config.command_buffer);
    let (broadcast_tx, _) = broadcast::channel::<RelayBroadcast>(config.broadcast_buffer);

    let app_state = AppState {
        relay_tx,
        broadcast_tx: broadcast_tx.clone(),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
    };

    tokio::spawn(async move {
        run_relay(relay_rx, broadcast_tx, config).await;
    });

    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

async fn recv_msg_timeout(ws: &mut Ws, timeout: Duration) -> Option<ServerMsg> {
    tokio::time::timeout(timeout, recv_msg(ws)).await.ok()
}

async fn send_msg(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Connect, read init, announce at the origin. Returns the socket and its id.
async fn join(url: &str) -> (Ws, String) {
    let mut ws = connect(url).await;
    let id = match recv_msg(&mut ws).await {
        ServerMsg::InitUser(init) => init.self_id,
        other => panic!("Expected InitUser, got {:?}", other),
    };
    send_msg(
        &mut ws,
        &ClientMsg::UserDidInit(UserMsg::new(id.clone(), UserState::default())),
    )
    .await;
    (ws, id)
}

/// Skip messages until one matches, or give up after `timeout`.
async fn wait_for<F>(ws: &mut Ws, timeout: Duration, mut pred: F) -> Option<ServerMsg>
where
    F: FnMut(&ServerMsg) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(tokio::time::Instant::now());
        let msg = recv_msg_timeout(ws, left).await?;
        if pred(&msg) {
            return Some(msg);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_and_receive_init() {
    let url = start_test_server(16).await;
    let mut ws = connect(&url).await;

    match recv_msg(&mut ws).await {
        ServerMsg::InitUser(init) => {
            assert_eq!(init.protocol_version, PROTOCOL_VERSION);
            assert!(!init.self_id.is_empty());
            assert!(init.users.is_empty(), "first client sees nobody");
        }
        other => panic!("Expected InitUser, got {:?}", other),
    }
}

#[tokio::test]
async fn test_multiple_clients_get_unique_ids() {
    let url = start_test_server(16).await;
    let (_ws1, id1) = join(&url).await;
    let (_ws2, id2) = join(&url).await;
    assert_ne!(id1, id2, "Each client should get a unique ID");
}

#[tokio::test]
async fn test_late_joiner_sees_announced_users() {
    let url = start_test_server(16).await;
    let (mut ws1, id1) = join(&url).await;
    send_msg(
        &mut ws1,
        &ClientMsg::UserDidUpdate(UserMsg::new(id1.clone(), UserState::at(0.5, -0.25))),
    )
    .await;
    // Let the relay process both messages before the next connect.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut ws2 = connect(&url).await;
    match recv_msg(&mut ws2).await {
        ServerMsg::InitUser(init) => {
            assert_eq!(init.users.len(), 1);
            assert_eq!(init.users[&id1], UserState::at(0.5, -0.25));
        }
        other => panic!("Expected InitUser, got {:?}", other),
    }
}

#[tokio::test]
async fn test_join_update_and_disconnect_are_relayed() {
    let url = start_test_server(16).await;
    let (mut ws1, _id1) = join(&url).await;
    let (mut ws2, id2) = join(&url).await;

    // ws1 learns about ws2
    let joined = wait_for(&mut ws1, Duration::from_secs(1), |m| {
        matches!(m, ServerMsg::UserDidInit(u) if u.user_id == id2)
    })
    .await;
    assert!(joined.is_some(), "ws1 should see ws2 join");

    // ws2 moves, ws1 sees it
    send_msg(
        &mut ws2,
        &ClientMsg::UserDidUpdate(UserMsg::new(id2.clone(), UserState::at(-1.0, 1.0))),
    )
    .await;
    match wait_for(&mut ws1, Duration::from_secs(1), |m| {
        matches!(m, ServerMsg::UserDidUpdate(_))
    })
    .await
    {
        Some(ServerMsg::UserDidUpdate(u)) => {
            assert_eq!(u.user_id, id2);
            assert_eq!(u.user, UserState::at(-1.0, 1.0));
        }
        other => panic!("Expected UserDidUpdate, got {:?}", other),
    }

    // ws2 leaves, ws1 is told
    ws2.close(None).await.unwrap();
    let left = wait_for(&mut ws1, Duration::from_secs(1), |m| {
        matches!(m, ServerMsg::UserDidDisconnect(u) if u.user_id == id2)
    })
    .await;
    assert!(left.is_some(), "ws1 should see ws2 disconnect");
}

#[tokio::test]
async fn test_sender_does_not_receive_own_update() {
    let url = start_test_server(16).await;
    let (mut ws, id) = join(&url).await;
    send_msg(
        &mut ws,
        &ClientMsg::UserDidUpdate(UserMsg::new(id, UserState::at(0.1, 0.1))),
    )
    .await;
    assert!(
        recv_msg_timeout(&mut ws, Duration::from_millis(200))
            .await
            .is_none(),
        "Own messages must not be echoed"
    );
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    let url = start_test_server(16).await;
    let (mut ws1, _id1) = join(&url).await;
    let (mut ws2, id2) = join(&url).await;

    ws2.send(Message::Text("not json".into())).await.unwrap();
    send_msg(
        &mut ws2,
        &ClientMsg::UserDidUpdate(UserMsg::new(id2.clone(), UserState::at(0.2, 0.2))),
    )
    .await;

    let update = wait_for(&mut ws1, Duration::from_secs(1), |m| {
        matches!(m, ServerMsg::UserDidUpdate(u) if u.user_id == id2)
    })
    .await;
    assert!(update.is_some(), "Relay should survive a malformed frame");
}

#[tokio::test]
async fn test_connection_limit_rejects_excess() {
    let url = start_test_server(1).await;
    let (_ws1, _) = join(&url).await;
    assert!(
        connect_async(url.as_str()).await.is_err(),
        "Second connection should be refused"
    );
}
