use crate::config::RelayConfig;
use crate::room::RoomRegistry;
use std::sync::Arc;

struct RelayInner {
    registry: RoomRegistry,
    config: RelayConfig,
}

/// Состояние релея, общее для всех WebSocket-подключений (внутри Arc).
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                registry: RoomRegistry::new(config.room_capacity, config.max_message_size),
                config,
            }),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }
}
