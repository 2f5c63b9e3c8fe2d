use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use bevy::prelude::Resource;

use super::protocol::{ClientMsg, ServerMsg};
#[cfg(not(target_arch = "wasm32"))]
use super::protocol::CLIENT_PROTOCOL_VERSION;

#[derive(Debug, Clone)]
pub enum NetEvent {
    Connected,
    Disconnected,
    Message(ServerMsg),
    ProtocolMismatch { server: u32, client: u32 },
}

#[cfg(not(target_arch = "wasm32"))]
type NativeCmdSender = tokio::sync::mpsc::UnboundedSender<ClientMsg>;

/// Bridge between the update loop and the relay socket.
///
/// Inbound events queue up until [`ServerConnection::poll_events`] drains
/// them; outbound messages are fire-and-forget.
#[derive(Resource)]
pub struct ServerConnection {
    event_rx: Mutex<Receiver<NetEvent>>,

    #[cfg(not(target_arch = "wasm32"))]
    cmd_tx: Option<NativeCmdSender>,
}

impl ServerConnection {
    pub fn new(url: String) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<NetEvent>();

        #[cfg(not(target_arch = "wasm32"))]
        let cmd_tx = Some(spawn_native_network_thread(url, event_tx));

        #[cfg(target_arch = "wasm32")]
        let _ = (url, event_tx);

        Self {
            event_rx: Mutex::new(event_rx),
            #[cfg(not(target_arch = "wasm32"))]
            cmd_tx,
        }
    }

    /// Connection with no network thread. Tests push scripted events through
    /// the returned sender and read what the client emitted from the receiver.
    #[cfg(all(test, not(target_arch = "wasm32")))]
    pub fn test_stub() -> (
        Self,
        Sender<NetEvent>,
        tokio::sync::mpsc::UnboundedReceiver<ClientMsg>,
    ) {
        let (event_tx, event_rx) = mpsc::channel::<NetEvent>();
        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMsg>();
        let conn = Self {
            event_rx: Mutex::new(event_rx),
            cmd_tx: Some(cmd_tx),
        };
        (conn, event_tx, cmd_rx)
    }

    pub fn poll_events(&mut self) -> Vec<NetEvent> {
        let mut out = Vec::new();
        if let Ok(rx) = self.event_rx.lock() {
            while let Ok(evt) = rx.try_recv() {
                out.push(evt);
            }
        }
        out
    }

    pub fn send(&self, msg: ClientMsg) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Some(tx) = &self.cmd_tx {
                let _ = tx.send(msg);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let _ = msg;
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_native_network_thread(url: String, event_tx: Sender<NetEvent>) -> NativeCmdSender {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let (cmd_tx, mut cmd_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMsg>();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_io()
            .enable_time()
            .build()
            .expect("failed to build tokio runtime");

        rt.block_on(async move {
            let mut reconnect_delay = Duration::from_millis(1000);
            let max_delay = Duration::from_millis(30_000);

            loop {
                let connect = tokio_tungstenite::connect_async(url.as_str()).await;

                let (ws_stream, _) = match connect {
                    Ok(x) => x,
                    Err(e) => {
                        bevy::log::debug!("Connect to {} failed: {}", url, e);
                        tokio::time::sleep(reconnect_delay).await;
                        reconnect_delay = (reconnect_delay.mul_f32(1.5)).min(max_delay);
                        continue;
                    }
                };

                reconnect_delay = Duration::from_millis(1000);
                // Anything queued while offline belongs to the old session.
                while cmd_rx.try_recv().is_ok() {}
                let _ = event_tx.send(NetEvent::Connected);

                let (mut write, mut read) = ws_stream.split();

                loop {
                    tokio::select! {
                        biased;

                        Some(cmd) = cmd_rx.recv() => {
                            if let Ok(text) = serde_json::to_string(&cmd) {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                        }

                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(txt))) => {
                                    match serde_json::from_str::<ServerMsg>(&txt) {
                                        Ok(server_msg) => {
                                            if let ServerMsg::InitUser(init) = &server_msg {
                                                if init.protocol_version != CLIENT_PROTOCOL_VERSION {
                                                    let _ = event_tx.send(NetEvent::ProtocolMismatch {
                                                        server: init.protocol_version,
                                                        client: CLIENT_PROTOCOL_VERSION,
                                                    });
                                                    let _ = write.close().await;
                                                    break;
                                                }
                                            }
                                            let _ = event_tx.send(NetEvent::Message(server_msg));
                                        }
                                        Err(e) => bevy::log::debug!("Ignoring malformed message: {}", e),
                                    }
                                }
                                Some(Ok(Message::Close(_))) => {
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(_)) => {
                                    break;
                                }
                                None => {
                                    break;
                                }
                            }
                        }
                    }
                }

                let _ = event_tx.send(NetEvent::Disconnected);
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay.mul_f32(1.5)).min(max_delay);
            }
        });
    });

    cmd_tx
}
