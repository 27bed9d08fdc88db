use duet_core::{MemberId, RoomMember};
use serde_json::Value;

/// События, которые pub/sub транспорт доставляет участнику.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Подписка на канал подтверждена. Снимок состава комнаты, включая себя.
    Subscribed { members: Vec<RoomMember> },

    MemberJoined(RoomMember),

    MemberLeft(MemberId),

    /// Событие, опубликованное другим участником канала.
    Message {
        event: String,
        payload: Value,
        sender: Option<MemberId>,
    },

    /// Соединение с каналом потеряно; других событий не будет.
    Disconnected,
}
