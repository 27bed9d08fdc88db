use duet_core::{IceServerConfig, default_ice_servers};
use std::env;

pub const TURN_URL_ENV: &str = "DUET_TURN_URL";
pub const TURN_USERNAME_ENV: &str = "DUET_TURN_USERNAME";
pub const TURN_CREDENTIAL_ENV: &str = "DUET_TURN_CREDENTIAL";

/// Конфигурация для WebRTC
#[derive(Debug, Clone)]
pub struct WebRtcConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub ice_candidate_pool_size: u8,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            ice_candidate_pool_size: 10,
        }
    }
}

impl WebRtcConfig {
    /// Без STUN: только host-кандидаты, для локальных тестов.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_ice_server(mut self, server: IceServerConfig) -> Self {
        self.ice_servers.push(server);
        self
    }

    /// Appends a TURN server when `DUET_TURN_URL` is set.
    pub fn with_turn_from_env(self) -> Self {
        let Ok(url) = env::var(TURN_URL_ENV) else {
            return self;
        };
        self.with_ice_server(IceServerConfig {
            urls: vec![url],
            username: env::var(TURN_USERNAME_ENV).ok(),
            credential: env::var(TURN_CREDENTIAL_ENV).ok(),
        })
    }
}
