use std::net::SocketAddr;

/// Invalid relay configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("listen_addr {0:?} is not a socket address")]
    ListenAddr(String),
    #[error("{0} must be > 0")]
    Zero(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Env { var: &'static str, value: String },
}

/// Relay configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub max_connections: usize,
    /// Capacity of the connection -> relay command channel
    pub command_buffer: usize,
    /// Capacity of the relay -> connections broadcast channel
    pub broadcast_buffer: usize,
    /// Seed for id allocation. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            max_connections: 256,
            command_buffer: 256,
            broadcast_buffer: 256,
            rng_seed: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `BUBBLES_LISTEN_ADDR` and `BUBBLES_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("BUBBLES_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(raw) = lookup("BUBBLES_MAX_CONNECTIONS") {
            config.max_connections = raw.parse().map_err(|_| ConfigError::Env {
                var: "BUBBLES_MAX_CONNECTIONS",
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::ListenAddr(self.listen_addr.clone()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Zero("max_connections"));
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::Zero("command_buffer"));
        }
        if self.broadcast_buffer == 0 {
            return Err(ConfigError::Zero("broadcast_buffer"));
        }
        Ok(())
    }
}
