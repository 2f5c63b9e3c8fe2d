use bubbles_shared::protocol::{ClientMsg, InitUserMsg, ServerMsg, UserLeftMsg, UserMsg};
use bubbles_shared::user::UserId;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::ServerConfig;
use crate::state::{Applied, RelayState};

/// Commands from client connections to the relay task
pub enum RelayCommand {
    Connect {
        response: oneshot::Sender<(UserId, InitUserMsg)>,
    },
    Disconnect {
        id: UserId,
    },
    Client {
        id: UserId,
        msg: ClientMsg,
    },
}

/// A message for every connection except `origin`.
#[derive(Debug, Clone)]
pub struct RelayBroadcast {
    pub origin: UserId,
    pub msg: ServerMsg,
}

/// Run the relay. Owns all relay state and exits once every command sender
/// is gone.
pub async fn run_relay(
    mut cmd_rx: mpsc::Receiver<RelayCommand>,
    broadcast_tx: broadcast::Sender<RelayBroadcast>,
    config: ServerConfig,
) {
    let mut state = RelayState::new(config.rng_seed);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            RelayCommand::Connect { response } => {
                let (id, init) = state.connect();
                tracing::debug!(
                    "Assigned id {} ({} connections)",
                    id,
                    state.connection_count()
                );
                if response.send((id.clone(), init)).is_err() {
                    // Socket went away before it could be greeted.
                    state.disconnect(&id);
                }
            }
            RelayCommand::Disconnect { id } => {
                if state.disconnect(&id) {
                    let _ = broadcast_tx.send(RelayBroadcast {
                        origin: id.clone(),
                        msg: ServerMsg::UserDidDisconnect(UserLeftMsg { user_id: id.clone() }),
                    });
                    tracing::info!("User {} left", id);
                }
            }
            RelayCommand::Client { id, msg } => {
                if let Some(out) = apply_client_msg(&mut state, &id, msg) {
                    let _ = broadcast_tx.send(RelayBroadcast { origin: id, msg: out });
                }
            }
        }
    }

    tracing::info!("Relay loop ended");
}

/// Apply one client message on behalf of connection `id`, returning what to
/// rebroadcast. The connection's own id always wins over the payload's.
fn apply_client_msg(state: &mut RelayState, id: &str, msg: ClientMsg) -> Option<ServerMsg> {
    if msg.user_id() != id {
        tracing::warn!(
            "Connection {} sent a message for {}, re-attributing",
            id,
            msg.user_id()
        );
    }

    match msg {
        ClientMsg::UserDidInit(m) => match state.user_did_init(id, m.user.clone()) {
            Applied::Relay => Some(ServerMsg::UserDidInit(UserMsg::new(id, m.user))),
            Applied::Dropped => None,
        },
        ClientMsg::UserDidUpdate(m) => match state.user_did_update(id, m.user.clone()) {
            Applied::Relay => Some(ServerMsg::UserDidUpdate(UserMsg::new(id, m.user))),
            Applied::Dropped => {
                tracing::warn!("Dropping update from {} before user_did_init", id);
                None
            }
        },
    }
}
