use crate::error::RelayError;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_RELAY_ADDR: &str = "0.0.0.0:3000";

/// Настройки релея. Значения по умолчанию совпадают с ограничениями
/// хостингового pub/sub: 2 участника в комнате, 10 KiB на сообщение.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub room_capacity: usize,
    pub max_message_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            room_capacity: 2,
            max_message_size: 10 * 1024,
        }
    }
}

impl RelayConfig {
    /// Reads `DUET_RELAY_ADDR`, `DUET_ROOM_CAPACITY` and `DUET_MAX_MESSAGE_SIZE`,
    /// falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let defaults = Self::default();
        Ok(Self {
            bind: parse(&lookup, "DUET_RELAY_ADDR", defaults.bind)?,
            room_capacity: parse(&lookup, "DUET_ROOM_CAPACITY", defaults.room_capacity)?,
            max_message_size: parse(&lookup, "DUET_MAX_MESSAGE_SIZE", defaults.max_message_size)?,
        })
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_room_capacity(mut self, capacity: usize) -> Self {
        self.room_capacity = capacity;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, RelayError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| RelayError::InvalidEnv { name, value }),
    }
}
