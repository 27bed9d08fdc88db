use async_trait::async_trait;
use duet_core::{ConnectivityState, MediaTrack, SdpType, SessionDescription, TrackKind};
use duet_peer::{MediaError, MediaEvent, MediaSource, MediaTransport, MediaTransportFactory};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};

/// Blocks `create_offer` / `create_answer` of every mock transport until released.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until some transport is blocked on the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct MockState {
    created: AtomicUsize,
    closed: AtomicUsize,
    sdp_padding: usize,
    gate: Option<Arc<Gate>>,
    withhold: Option<SdpType>,
}

/// Factory of `MockMediaTransport`s with call counters.
///
/// Offers and answers are synthetic SDP strings; applying an answer (or
/// creating one) reports one remote audio track and `Connected`.
#[derive(Clone, Default)]
pub struct MockMediaFactory {
    state: Arc<MockState>,
}

impl MockMediaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pads every generated SDP by `padding` bytes to force chunking.
    pub fn with_sdp_padding(padding: usize) -> Self {
        Self {
            state: Arc::new(MockState {
                sdp_padding: padding,
                ..Default::default()
            }),
        }
    }

    /// Transports that fail to produce one kind of description: offers come
    /// back as `None`, answers as an empty SDP.
    pub fn withholding(kind: SdpType) -> Self {
        Self {
            state: Arc::new(MockState {
                withhold: Some(kind),
                ..Default::default()
            }),
        }
    }

    /// Create a factory whose transports block on the returned gate.
    pub fn gated() -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        let factory = Self {
            state: Arc::new(MockState {
                gate: Some(gate.clone()),
                ..Default::default()
            }),
        };
        (factory, gate)
    }

    /// Number of transports created so far.
    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Number of transports closed so far.
    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTransportFactory for MockMediaFactory {
    async fn create(
        &self,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Arc<dyn MediaTransport>, MediaError> {
        let n = self.state.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockMediaTransport {
            instance: n,
            events,
            state: self.state.clone(),
        }))
    }
}

pub struct MockMediaTransport {
    instance: usize,
    events: mpsc::UnboundedSender<MediaEvent>,
    state: Arc<MockState>,
}

impl MockMediaTransport {
    fn sdp(&self, kind: &str) -> String {
        format!(
            "v=0\r\ns=mock-{}-{}\r\na=pad:{}\r\n",
            kind,
            self.instance,
            "x".repeat(self.state.sdp_padding)
        )
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.state.gate {
            gate.pass().await;
        }
    }

    fn report_remote_media(&self) {
        let track = MediaTrack::new(TrackKind::Audio, format!("remote-{}", self.instance));
        let _ = self.events.send(MediaEvent::RemoteTrack(track));
        let _ = self
            .events
            .send(MediaEvent::Connectivity(ConnectivityState::Connected));
    }
}

#[async_trait]
impl MediaTransport for MockMediaTransport {
    async fn create_offer(&self) -> Result<Option<SessionDescription>, MediaError> {
        self.wait_gate().await;
        if self.state.withhold == Some(SdpType::Offer) {
            return Ok(None);
        }
        Ok(Some(SessionDescription::offer(self.sdp("offer"))))
    }

    async fn create_answer(
        &self,
        remote_offer: &SessionDescription,
    ) -> Result<Option<SessionDescription>, MediaError> {
        if remote_offer.kind != SdpType::Offer {
            return Err(MediaError::Backend("expected an offer".into()));
        }
        self.wait_gate().await;
        if self.state.withhold == Some(SdpType::Answer) {
            return Ok(Some(SessionDescription::answer("")));
        }
        self.report_remote_media();
        Ok(Some(SessionDescription::answer(self.sdp("answer"))))
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), MediaError> {
        if desc.kind == SdpType::Answer {
            self.report_remote_media();
        }
        Ok(())
    }

    async fn add_local_track(&self, _track: &MediaTrack) -> Result<(), MediaError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Media source that always refuses access.
pub struct DeniedMediaSource;

#[async_trait]
impl MediaSource for DeniedMediaSource {
    async fn acquire(&self) -> Result<Vec<MediaTrack>, MediaError> {
        Err(MediaError::AccessDenied("permission dismissed".into()))
    }

    async fn release(&self, _tracks: &[MediaTrack]) {}
}
