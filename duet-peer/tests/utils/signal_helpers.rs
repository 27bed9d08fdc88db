use anyhow::{Context, Result};
use duet_core::RoomMember;
use duet_peer::{
    LocalBus, MediaSource, MediaTransportFactory, Session, SessionConfig, SessionEvent,
    StaticMediaSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::fault_inbox::{Fault, FaultInbox};

/// Channel used by every local scenario.
pub const ROOM: &str = "room";

/// Timeout for reaching a negotiation state (ms).
pub const NEGOTIATION_TIMEOUT_MS: u64 = 5000;

/// Timeout for a real WebRTC exchange, ICE gathering included (ms).
pub const WEBRTC_TIMEOUT_MS: u64 = 20000;

/// Describes one participant of a local scenario.
pub struct Participant {
    pub id: &'static str,
    pub config: SessionConfig,
    pub factory: Arc<dyn MediaTransportFactory>,
    pub media: Arc<dyn MediaSource>,
    pub fault: Option<Fault>,
}

impl Participant {
    pub fn owner(factory: Arc<dyn MediaTransportFactory>) -> Self {
        Self::new("owner", SessionConfig::owner(), factory)
    }

    pub fn guest(factory: Arc<dyn MediaTransportFactory>) -> Self {
        Self::new("guest", SessionConfig::guest(), factory)
    }

    pub fn new(
        id: &'static str,
        config: SessionConfig,
        factory: Arc<dyn MediaTransportFactory>,
    ) -> Self {
        Self {
            id,
            config,
            factory,
            media: Arc::new(StaticMediaSource::audio_only()),
            fault: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaSource>) -> Self {
        self.media = media;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }
}

/// A started session and, when a fault was requested, its inbox handle.
pub struct Joined {
    pub session: Session,
    pub events: broadcast::Receiver<SessionEvent>,
    pub inbox: Option<FaultInbox>,
}

/// Connect `participant` to the local bus and start its session.
pub async fn join(bus: &LocalBus, participant: Participant) -> Result<Joined> {
    let member = RoomMember::new(participant.id, participant.id.to_uppercase());
    let (client, rx) = bus
        .connect(ROOM, member)
        .with_context(|| format!("{} failed to subscribe", participant.id))?;

    let (inbox, rx) = match participant.fault {
        Some(fault) => {
            let (inbox, rx) = FaultInbox::inject(rx, fault);
            (Some(inbox), rx)
        }
        None => (None, rx),
    };

    let session = Session::start(
        participant.config,
        Arc::new(client),
        rx,
        participant.factory,
        participant.media,
    )
    .await
    .with_context(|| format!("{} failed to start", participant.id))?;
    tracing::debug!("[SignalHelper] {} joined as {}", participant.id, session.role());

    let events = session.events();
    Ok(Joined {
        session,
        events,
        inbox,
    })
}

/// Wait for the first event matching `pred`, skipping the others.
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    timeout_ms: u64,
    mut pred: F,
) -> Result<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Ok(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    anyhow::bail!("Event channel closed")
                }
            }
        }
    };

    tokio::time::timeout(Duration::from_millis(timeout_ms), wait)
        .await
        .context("Timeout waiting for event")?
}

/// Drain every event received within `window_ms`.
pub async fn collect_events(
    events: &mut broadcast::Receiver<SessionEvent>,
    window_ms: u64,
) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(window_ms);

    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => out.push(event),
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => break,
        }
    }
    out
}
