mod chunk;
mod event;
mod media;
mod member;
mod relay;
mod role;
mod signaling;

pub use chunk::Chunk;
pub use event::{
    CHUNKED_ANSWER, CHUNKED_OFFER, ChatMessage, EventName, MESSAGE, USER_JOINED, UserJoined,
};
pub use media::{ConnectivityState, MediaTrack, RemoteStream, TrackKind};
pub use member::{MemberId, RoomMember};
pub use relay::{RelayErrorCode, RelayFrame};
pub use role::SessionRole;
pub use signaling::{
    AnswerPayload, IceServerConfig, OfferPayload, SdpType, SessionDescription, SignalingMessage,
    default_ice_servers,
};
