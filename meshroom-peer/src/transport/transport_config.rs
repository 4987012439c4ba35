use meshroom_core::IceServerConfig;
use std::env;

pub const DEFAULT_RENDEZVOUS_URL: &str = "ws://127.0.0.1:9000/ws";

/// Rendezvous endpoint and ICE (STUN/TURN) servers.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub rendezvous_url: String,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            rendezvous_url: DEFAULT_RENDEZVOUS_URL.to_owned(),
            ice_servers: vec![
                IceServerConfig::stun("stun:stun.l.google.com:19302"),
                IceServerConfig::stun("stun:stun1.l.google.com:19302"),
            ],
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `MESHROOM_RENDEZVOUS_URL`, plus a TURN server
    /// when `MESHROOM_TURN_URL` is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("MESHROOM_RENDEZVOUS_URL") {
            config.rendezvous_url = url;
        }

        if let Ok(turn_url) = env::var("MESHROOM_TURN_URL") {
            config.ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: env::var("MESHROOM_TURN_USERNAME").ok(),
                credential: env::var("MESHROOM_TURN_CREDENTIAL").ok(),
            });
        }

        config
    }

    pub fn with_rendezvous_url(mut self, url: impl Into<String>) -> Self {
        self.rendezvous_url = url.into();
        self
    }
}
