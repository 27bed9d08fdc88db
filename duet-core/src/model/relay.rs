use crate::model::member::{MemberId, RoomMember};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayErrorCode {
    CapacityExceeded,
    PayloadTooLarge,
    BadRequest,
}

/// Кадры протокола presence-релея (JSON поверх WebSocket).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum RelayFrame {
    Subscribe {
        channel: String,
        member: RoomMember,
    },
    Subscribed {
        members: Vec<RoomMember>,
        max_message_size: usize,
    },
    /// A numbered publish is answered with `Published` or with an `Error`
    /// carrying the same `seq`.
    Publish {
        event: String,
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
    Published {
        seq: u64,
    },
    Event {
        event: String,
        data: Value,
        sender: MemberId,
    },
    MemberJoined {
        member: RoomMember,
    },
    MemberLeft {
        id: MemberId,
    },
    Error {
        code: RelayErrorCode,
        message: String,
        /// Capacity or size ceiling that was hit, when the error is about one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
}

impl RelayFrame {
    /// Sequence number of a publish frame, if the client asked for a reply.
    pub fn publish_seq(&self) -> Option<u64> {
        match self {
            Self::Publish { seq, .. } => *seq,
            _ => None,
        }
    }
}
