use crate::model::event::EventName;
use crate::model::member::MemberId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STUN_ADDR: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun2.l.google.com:19302";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            username: None,
            credential: None,
        }
    }
}

pub fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig::stun([DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2])]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// `{ "type": "offer", "sdp": "..." }`, same shape as the browser's `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sdp.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub offer: SessionDescription,
    pub sender_id: MemberId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub answer: SessionDescription,
    pub sender_id: MemberId,
}

/// Сообщение сигнального обмена. Сериализуется без тега: поле `offer` или `answer`
/// само определяет вариант.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalingMessage {
    Offer(OfferPayload),
    Answer(AnswerPayload),
}

impl SignalingMessage {
    pub fn offer(offer: SessionDescription, sender_id: MemberId) -> Self {
        Self::Offer(OfferPayload { offer, sender_id })
    }

    pub fn answer(answer: SessionDescription, sender_id: MemberId) -> Self {
        Self::Answer(AnswerPayload { answer, sender_id })
    }

    pub fn event(&self) -> EventName {
        match self {
            Self::Offer(_) => EventName::ChunkedOffer,
            Self::Answer(_) => EventName::ChunkedAnswer,
        }
    }

    pub fn sender_id(&self) -> &MemberId {
        match self {
            Self::Offer(p) => &p.sender_id,
            Self::Answer(p) => &p.sender_id,
        }
    }

    pub fn description(&self) -> &SessionDescription {
        match self {
            Self::Offer(p) => &p.offer,
            Self::Answer(p) => &p.answer,
        }
    }
}
