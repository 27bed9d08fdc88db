use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionRole {
    Offerer,
    Answerer,
}

impl SessionRole {
    /// Владелец комнаты всегда инициирует обмен SDP.
    pub const fn from_owner(is_owner: bool) -> Self {
        if is_owner { Self::Offerer } else { Self::Answerer }
    }

    pub const fn is_offerer(self) -> bool {
        matches!(self, Self::Offerer)
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offerer => f.write_str("offerer"),
            Self::Answerer => f.write_str("answerer"),
        }
    }
}
