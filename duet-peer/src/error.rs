use duet_core::{NegotiationError, NegotiationState};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("message of {size} bytes exceeds the {limit}-byte ceiling")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("channel `{channel}` is full ({capacity} members)")]
    CapacityExceeded { channel: String, capacity: usize },

    #[error("transport is closed")]
    Closed,

    #[error("relay rejected the request: {0}")]
    Rejected(String),

    #[error("relay did not acknowledge the publish within {0:?}")]
    Unacknowledged(Duration),

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media access denied: {0}")]
    AccessDenied(String),

    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),

    #[error("media backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("session is closed")]
    Closed,

    #[error("timed out waiting for the session, last state {0:?}")]
    WaitTimedOut(NegotiationState),
}
