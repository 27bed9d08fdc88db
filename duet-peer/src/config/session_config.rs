use std::time::Duration;

/// Максимальный размер одного сообщения у хостингового pub/sub (10 KiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 10 * 1024;

pub const DEFAULT_ROOM_CAPACITY: usize = 2;

/// Как резать сериализованный payload, который не влезает в одно сообщение.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkMode {
    /// Two chunks split at the midpoint; falls back to `Bounded` when a half
    /// still exceeds the ceiling.
    #[default]
    Halves,
    /// `ceil(len / max_chunk_size)` chunks.
    Bounded,
}

/// Настройки участника на время одного визита в комнату.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub is_owner: bool,
    pub max_chunk_size: usize,
    pub chunk_mode: ChunkMode,
    /// Disabled by default.
    pub negotiation_timeout: Option<Duration>,
    pub inbox_capacity: usize,
    pub room_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            is_owner: false,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            chunk_mode: ChunkMode::default(),
            negotiation_timeout: None,
            inbox_capacity: 64,
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn owner() -> Self {
        Self::default().with_owner(true)
    }

    pub fn guest() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size.max(1);
        self
    }

    pub fn with_chunk_mode(mut self, mode: ChunkMode) -> Self {
        self.chunk_mode = mode;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = Some(timeout);
        self
    }

    pub fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity.max(1);
        self
    }

    pub fn with_room_capacity(mut self, capacity: usize) -> Self {
        self.room_capacity = capacity;
        self
    }
}
