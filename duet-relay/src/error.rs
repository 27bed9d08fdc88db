use duet_core::{RelayErrorCode, RelayFrame};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("channel `{channel}` is full ({capacity} members)")]
    CapacityExceeded { channel: String, capacity: usize },

    #[error("message of {size} bytes exceeds the {limit}-byte ceiling")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("connection is not subscribed to a channel")]
    NotSubscribed,

    #[error("invalid frame: {0}")]
    BadFrame(String),

    #[error("invalid value `{value}` for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

impl RelayError {
    /// Кадр ошибки для клиента; `seq` связывает его с публикацией.
    pub fn to_frame(&self, seq: Option<u64>) -> RelayFrame {
        let (code, limit) = match self {
            Self::CapacityExceeded { capacity, .. } => {
                (RelayErrorCode::CapacityExceeded, Some(*capacity))
            }
            Self::PayloadTooLarge { limit, .. } => (RelayErrorCode::PayloadTooLarge, Some(*limit)),
            Self::NotSubscribed | Self::BadFrame(_) | Self::InvalidEnv { .. } => {
                (RelayErrorCode::BadRequest, None)
            }
        };
        RelayFrame::Error {
            code,
            message: self.to_string(),
            limit,
            seq,
        }
    }
}
