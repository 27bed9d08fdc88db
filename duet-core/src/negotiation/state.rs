use crate::model::{AnswerPayload, OfferPayload, SessionDescription, SignalingMessage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Состояние одного экземпляра соединения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationState {
    Idle,
    ConnectionOpen,
    OfferSent,
    OfferApplied,
    Connected,
    Closed,
}

impl NegotiationState {
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationInput {
    LocalJoined,
    PeerJoined,
    OfferReceived(OfferPayload),
    AnswerReceived(AnswerPayload),
    /// Local description produced by the media transport after `CreateOffer`.
    LocalOfferReady(SessionDescription),
    /// Local description produced by the media transport after `CreateAnswer`.
    LocalAnswerReady(SessionDescription),
    Teardown,
}

impl NegotiationInput {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LocalJoined => "local-joined",
            Self::PeerJoined => "peer-joined",
            Self::OfferReceived(_) => "offer-received",
            Self::AnswerReceived(_) => "answer-received",
            Self::LocalOfferReady(_) => "local-offer-ready",
            Self::LocalAnswerReady(_) => "local-answer-ready",
            Self::Teardown => "teardown",
        }
    }
}

/// Побочные эффекты перехода. Исполняются координатором строго по порядку.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenConnection,
    CreateOffer,
    CreateAnswer(SessionDescription),
    ApplyAnswer(SessionDescription),
    Publish(SignalingMessage),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Advance {
        next: NegotiationState,
        effects: Vec<Effect>,
    },
    /// Input is valid but has nothing to do in this state.
    Ignore,
}

impl Step {
    pub fn advance(next: NegotiationState, effects: impl Into<Vec<Effect>>) -> Self {
        Self::Advance {
            next,
            effects: effects.into(),
        }
    }
}
