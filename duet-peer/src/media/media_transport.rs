use super::media_event::MediaEvent;
use crate::error::MediaError;
use async_trait::async_trait;
use duet_core::{MediaTrack, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Непрозрачный медиатранспорт одного экземпляра соединения.
///
/// `create_offer` и `create_answer` устанавливают результат как локальное
/// описание и возвращают его уже с собранными ICE-кандидатами.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_offer(&self) -> Result<Option<SessionDescription>, MediaError>;

    /// Applies `remote_offer` as the remote description, then answers it.
    async fn create_answer(
        &self,
        remote_offer: &SessionDescription,
    ) -> Result<Option<SessionDescription>, MediaError>;

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), MediaError>;

    async fn add_local_track(&self, track: &MediaTrack) -> Result<(), MediaError>;

    async fn close(&self) -> Result<(), MediaError>;
}

/// Creates a fresh transport for every connection instance.
#[async_trait]
pub trait MediaTransportFactory: Send + Sync {
    async fn create(
        &self,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Arc<dyn MediaTransport>, MediaError>;
}
