use crate::negotiation::NegotiationState;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("reassembled payload is not valid JSON: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("media transport is not available for `{operation}`")]
    TransportUnavailable { operation: &'static str },

    #[error("`{input}` does not apply in state {state:?}")]
    StaleEvent {
        state: NegotiationState,
        input: &'static str,
    },

    #[error("could not reassemble `{event}`: {reason}")]
    MalformedReassembly { event: String, reason: String },

    #[error("channel `{channel}` is full ({capacity} members)")]
    CapacityExceeded { channel: String, capacity: usize },

    #[error("local media access denied: {0}")]
    MediaAccessDenied(String),

    #[error("media transport produced no offer")]
    OfferUnavailable,

    #[error("media transport produced no answer")]
    AnswerUnavailable,

    #[error("negotiation did not reach Connected within {0:?}")]
    NegotiationTimedOut(Duration),
}

impl NegotiationError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleEvent { .. })
    }
}
