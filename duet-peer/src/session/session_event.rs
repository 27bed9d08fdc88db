use crate::error::SessionError;
use duet_core::{
    ChatMessage, ConnectivityState, MediaTrack, MemberId, NegotiationState, RoomMember,
    SessionRole,
};
use std::sync::Arc;

/// Исходящие события сессии, рассылаются через `tokio::sync::broadcast`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    RoleAssigned(SessionRole),

    StateChanged {
        from: NegotiationState,
        to: NegotiationState,
        generation: u64,
    },

    PeerJoined(RoomMember),

    PeerLeft(RoomMember),

    /// A chunked event was reassembled and handed to the coordinator.
    ReassemblyCompleted { event: String },

    ReassemblyFailed { event: String, reason: String },

    /// An input that does not apply in the current state was discarded.
    StaleEvent {
        input: &'static str,
        state: NegotiationState,
    },

    RemoteTrack(MediaTrack),

    ConnectivityChanged(ConnectivityState),

    Chat(ChatMessage),

    /// A member announced itself on the `user-joined` event.
    MemberAnnounced(MemberId),

    Error(Arc<SessionError>),

    TornDown { generation: u64 },
}
