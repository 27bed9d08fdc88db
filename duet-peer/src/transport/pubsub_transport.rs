use crate::error::TransportError;
use async_trait::async_trait;
use duet_core::RoomMember;
use serde_json::Value;

/// Канал комнаты на стороне участника: публикация именованных событий.
///
/// Входящий трафик приходит отдельно, как `TransportEvent` в mpsc-получателе,
/// выданном при подключении. Доставка at-least-once, порядок не гарантирован.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    fn channel_id(&self) -> &str;

    fn local_member(&self) -> &RoomMember;

    /// Ceiling for the serialized JSON of a single payload, in bytes.
    fn max_message_size(&self) -> usize;

    /// Resolves once the transport has accepted or refused the message.
    async fn publish(&self, event: &str, payload: Value) -> Result<(), TransportError>;

    async fn disconnect(&self);
}

/// Size of a payload as the transport counts it.
pub fn payload_size(payload: &Value) -> Result<usize, TransportError> {
    Ok(serde_json::to_string(payload)?.len())
}
