use duet_core::RoomMember;

/// Эффективное изменение состава комнаты.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Joined(RoomMember),
    Left(RoomMember),
}

impl PresenceEvent {
    pub fn member(&self) -> &RoomMember {
        match self {
            Self::Joined(m) | Self::Left(m) => m,
        }
    }
}
