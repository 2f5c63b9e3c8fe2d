use std::collections::BTreeMap;

use bevy::log::{debug, info, warn};
use bevy::prelude::{Resource, Vec2};

use super::protocol::{ClientMsg, InitUserMsg, ServerMsg, UserId, UserMsg, UserState};

/// Per-session client state: who we are, where everyone is, and whether the
/// scene is behind.
///
/// All mutation goes through methods. Methods that must tell the relay
/// something return the message; the caller owns the transport.
#[derive(Resource, Debug, Default)]
pub struct Session {
    self_id: Option<UserId>,
    users: BTreeMap<UserId, UserState>,
    dirty: bool,
}

impl Session {
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    pub fn users(&self) -> &BTreeMap<UserId, UserState> {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&UserState> {
        self.users.get(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the scene as needing a full reconcile without changing any user.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Apply one inbound relay event.
    pub fn handle(&mut self, msg: ServerMsg) -> Option<ClientMsg> {
        match msg {
            ServerMsg::InitUser(init) => Some(self.on_init(init)),
            ServerMsg::UserDidInit(m) => {
                self.on_user_joined(m);
                None
            }
            ServerMsg::UserDidUpdate(m) => {
                self.on_user_updated(m);
                None
            }
            ServerMsg::UserDidDisconnect(m) => {
                self.on_user_left(&m.user_id);
                None
            }
        }
    }

    /// Local pointer moved to `ndc`. Returns the update to send, or `None`
    /// before the relay has assigned us an id.
    pub fn pointer_moved(&mut self, ndc: Vec2) -> Option<ClientMsg> {
        let id = self.self_id.clone()?;
        let user = self.users.entry(id.clone()).or_default();
        user.x = f64::from(ndc.x);
        user.y = f64::from(ndc.y);
        let snapshot = user.clone();
        self.dirty = true;
        Some(ClientMsg::UserDidUpdate(UserMsg::new(id, snapshot)))
    }

    /// Drop everything; the next init rebuilds the session.
    pub fn reset(&mut self) {
        if self.self_id.is_none() && self.users.is_empty() {
            return;
        }
        self.self_id = None;
        self.users.clear();
        self.dirty = true;
    }

    fn on_init(&mut self, init: InitUserMsg) -> ClientMsg {
        info!(
            "Session: connected as {} with {} other users",
            init.self_id,
            init.users.len()
        );
        let me = UserState::default();
        self.users = init.users;
        self.users.insert(init.self_id.clone(), me.clone());
        self.self_id = Some(init.self_id.clone());
        self.dirty = true;
        ClientMsg::UserDidInit(UserMsg::new(init.self_id, me))
    }

    fn on_user_joined(&mut self, m: UserMsg) {
        debug!("Session: user {} joined at {}, {}", m.user_id, m.user.x, m.user.y);
        self.users.insert(m.user_id, m.user);
        self.dirty = true;
    }

    fn on_user_updated(&mut self, m: UserMsg) {
        match self.users.get_mut(&m.user_id) {
            Some(user) => {
                *user = m.user;
                self.dirty = true;
            }
            None => warn!("Session: ignoring update for unknown user {}", m.user_id),
        }
    }

    fn on_user_left(&mut self, id: &str) {
        if self.users.remove(id).is_some() {
            debug!("Session: user {} left", id);
            self.dirty = true;
        } else {
            debug!("Session: unknown user {} left", id);
        }
    }
}
