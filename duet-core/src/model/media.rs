use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, stream_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stream_id: stream_id.into(),
            kind,
        }
    }
}

/// Накопительный удалённый поток. Каждый экземпляр соединения получает свой,
/// изначально пустой.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    id: Uuid,
    tracks: Vec<MediaTrack>,
}

impl RemoteStream {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Returns `false` if a track with the same id is already present.
    pub fn add_track(&mut self, track: MediaTrack) -> bool {
        if self.tracks.iter().any(|t| t.id == track.id) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn remove_track(&mut self, track_id: &str) -> Option<MediaTrack> {
        let pos = self.tracks.iter().position(|t| t.id == track_id)?;
        Some(self.tracks.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for RemoteStream {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectivityState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}
