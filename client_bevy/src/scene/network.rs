use bevy::prelude::*;

use crate::shared::connection::{NetEvent, ServerConnection};
use crate::shared::session::Session;
use crate::shared::types::ConnectionState;

use super::UpdateSet;

pub struct NetworkPlugin;

#[derive(Resource, Default, Debug)]
pub(crate) struct NetworkState {
    pub(crate) connection: ConnectionState,
    pub(crate) protocol_mismatch: bool,
}

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NetworkState>()
            .add_systems(Update, network_event_system.in_set(UpdateSet::Network));
    }
}

/// Drain the socket and feed the session. Replies the session asks for
/// (the self announcement after init) go straight back out.
pub(crate) fn network_event_system(
    mut conn: ResMut<ServerConnection>,
    mut net: ResMut<NetworkState>,
    mut session: ResMut<Session>,
) {
    for evt in conn.poll_events() {
        match evt {
            NetEvent::Connected => {
                net.connection = ConnectionState::Connected;
                info!("WebSocket {}", net.connection.label());
                net.protocol_mismatch = false;
            }
            NetEvent::Disconnected => {
                if net.connection != ConnectionState::Disconnected {
                    net.connection = ConnectionState::Disconnected;
                    info!("WebSocket {}", net.connection.label());
                }
                if net.protocol_mismatch {
                    warn!("Server protocol differs from ours; retrying");
                }
                // The next init brings a fresh id and user list.
                session.reset();
            }
            NetEvent::ProtocolMismatch { server, client } => {
                warn!("Protocol mismatch: server={} client={}", server, client);
                net.protocol_mismatch = true;
            }
            NetEvent::Message(msg) => {
                if let Some(reply) = session.handle(msg) {
                    conn.send(reply);
                }
            }
        }
    }
}
