use std::collections::{BTreeMap, HashSet};

use bubbles_shared::protocol::{InitUserMsg, PROTOCOL_VERSION};
use bubbles_shared::user::{UserId, UserState};
use rand::distributions::Alphanumeric;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ID_LEN: usize = 20;

/// Everything the relay knows, owned by the relay task.
pub struct RelayState {
    /// Live connections, announced or not.
    connected: HashSet<UserId>,
    /// Users that have announced themselves with `user_did_init`.
    users: BTreeMap<UserId, UserState>,
    rng: ChaCha8Rng,
}

/// What a client message did to the relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// State changed; rebroadcast to the other connections.
    Relay,
    /// Sender is unknown or has not announced itself yet.
    Dropped,
}

impl RelayState {
    pub fn new(rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            connected: HashSet::new(),
            users: BTreeMap::new(),
            rng,
        }
    }

    /// Register a new connection. Returns its id and the init message to send.
    /// The snapshot does not contain the new connection itself.
    pub fn connect(&mut self) -> (UserId, InitUserMsg) {
        let id = loop {
            let candidate: UserId = (&mut self.rng)
                .sample_iter(&Alphanumeric)
                .take(ID_LEN)
                .map(char::from)
                .collect();
            if !self.connected.contains(&candidate) {
                break candidate;
            }
        };
        self.connected.insert(id.clone());
        let init = InitUserMsg {
            protocol_version: PROTOCOL_VERSION,
            self_id: id.clone(),
            users: self.users.clone(),
        };
        (id, init)
    }

    pub fn user_did_init(&mut self, id: &str, user: UserState) -> Applied {
        if !self.connected.contains(id) {
            return Applied::Dropped;
        }
        self.users.insert(id.to_string(), user);
        Applied::Relay
    }

    pub fn user_did_update(&mut self, id: &str, user: UserState) -> Applied {
        match self.users.get_mut(id) {
            Some(existing) => {
                *existing = user;
                Applied::Relay
            }
            None => Applied::Dropped,
        }
    }

    /// Forget a connection. Returns true if it was connected.
    pub fn disconnect(&mut self, id: &str) -> bool {
        self.users.remove(id);
        self.connected.remove(id)
    }

    pub fn users(&self) -> &BTreeMap<UserId, UserState> {
        &self.users
    }

    pub fn connection_count(&self) -> usize {
        self.connected.len()
    }
}
