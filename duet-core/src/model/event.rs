use crate::model::member::MemberId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CHUNKED_OFFER: &str = "chunked-offer";
pub const CHUNKED_ANSWER: &str = "chunked-answer";
pub const MESSAGE: &str = "message";
pub const USER_JOINED: &str = "user-joined";

/// Имена событий, публикуемых в канал комнаты.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    ChunkedOffer,
    ChunkedAnswer,
    Message,
    UserJoined,
}

impl EventName {
    pub const ALL: [EventName; 4] = [
        Self::ChunkedOffer,
        Self::ChunkedAnswer,
        Self::Message,
        Self::UserJoined,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChunkedOffer => CHUNKED_OFFER,
            Self::ChunkedAnswer => CHUNKED_ANSWER,
            Self::Message => MESSAGE,
            Self::UserJoined => USER_JOINED,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    pub const fn is_chunked(&self) -> bool {
        matches!(self, Self::ChunkedOffer | Self::ChunkedAnswer)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub body: String,
    pub sender_id: MemberId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserJoined {
    pub user_id: MemberId,
}
