use crate::error::MediaError;
use async_trait::async_trait;
use duet_core::{MediaTrack, TrackKind};
use tracing::debug;
use uuid::Uuid;

/// Источник локальных треков (камера, микрофон).
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fails with `MediaError::AccessDenied` when the user refuses access.
    async fn acquire(&self) -> Result<Vec<MediaTrack>, MediaError>;

    async fn release(&self, tracks: &[MediaTrack]);
}

/// Источник с фиксированным набором треков, без реального захвата.
#[derive(Debug, Clone)]
pub struct StaticMediaSource {
    kinds: Vec<TrackKind>,
}

impl StaticMediaSource {
    pub fn new(kinds: impl Into<Vec<TrackKind>>) -> Self {
        Self {
            kinds: kinds.into(),
        }
    }

    pub fn audio_only() -> Self {
        Self::new([TrackKind::Audio])
    }
}

impl Default for StaticMediaSource {
    fn default() -> Self {
        Self::new([TrackKind::Audio, TrackKind::Video])
    }
}

#[async_trait]
impl MediaSource for StaticMediaSource {
    async fn acquire(&self) -> Result<Vec<MediaTrack>, MediaError> {
        let stream_id = Uuid::new_v4().to_string();
        Ok(self
            .kinds
            .iter()
            .map(|kind| MediaTrack::new(*kind, stream_id.clone()))
            .collect())
    }

    async fn release(&self, tracks: &[MediaTrack]) {
        debug!(count = tracks.len(), "Local tracks stopped");
    }
}
