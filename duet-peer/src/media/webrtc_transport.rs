use super::media_event::MediaEvent;
use super::media_transport::{MediaTransport, MediaTransportFactory};
use crate::config::WebRtcConfig;
use crate::error::MediaError;
use async_trait::async_trait;
use duet_core::{ConnectivityState, MediaTrack, SdpType, SessionDescription, TrackKind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Медиатранспорт на webrtc-rs. Кандидаты не отправляются по одному: описание
/// возвращается после завершения ICE gathering и уже содержит их все.
pub struct WebRtcMediaTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcMediaTransport {
    pub async fn new(
        config: &WebRtcConfig,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Self, MediaError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ice_candidate_pool_size: config.ice_candidate_pool_size,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    let Some(state) = connectivity(s) else {
                        return;
                    };
                    let _ = tx.send(MediaEvent::Connectivity(state));
                })
            },
        ));

        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            Box::pin(async move {
                let Some(candidate) = c else {
                    debug!("ICE gathering finished");
                    return;
                };
                debug!("Local ICE candidate: {:?}", candidate);
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let tx = track_tx.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    _ => return,
                };
                let remote = MediaTrack {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                };
                info!(track = %remote.id, ?kind, "Remote track arrived");
                let _ = tx.send(MediaEvent::RemoteTrack(remote));
            })
        }));

        Ok(Self { peer_connection })
    }

    /// Sets `desc` as the local description and waits for ICE gathering.
    async fn set_local_and_gather(
        &self,
        desc: RTCSessionDescription,
    ) -> Result<Option<SessionDescription>, MediaError> {
        let mut gathering_complete = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection.set_local_description(desc).await?;
        let _ = gathering_complete.recv().await;

        Ok(self
            .peer_connection
            .local_description()
            .await
            .and_then(from_rtc))
    }
}

#[async_trait]
impl MediaTransport for WebRtcMediaTransport {
    async fn create_offer(&self) -> Result<Option<SessionDescription>, MediaError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.set_local_and_gather(offer).await
    }

    async fn create_answer(
        &self,
        remote_offer: &SessionDescription,
    ) -> Result<Option<SessionDescription>, MediaError> {
        self.set_remote_description(remote_offer).await?;
        let answer = self.peer_connection.create_answer(None).await?;
        self.set_local_and_gather(answer).await
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), MediaError> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn add_local_track(&self, track: &MediaTrack) -> Result<(), MediaError> {
        let mime_type = match track.kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let local = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.id.clone(),
            track.stream_id.clone(),
        ));

        let sender = self
            .peer_connection
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // RTCP has to be drained for interceptors to work; ends when the sender closes.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });

        debug!(track = %track.id, kind = ?track.kind, "Local track added");
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn connectivity(state: RTCPeerConnectionState) -> Option<ConnectivityState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectivityState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectivityState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectivityState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectivityState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectivityState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectivityState::Closed),
        _ => None,
    }
}

fn to_rtc(desc: &SessionDescription) -> Result<RTCSessionDescription, MediaError> {
    let rtc = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp.clone())?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp.clone())?,
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Option<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Some(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Some(SessionDescription::answer(desc.sdp)),
        _ => None,
    }
}

/// Фабрика: по одному `RTCPeerConnection` на экземпляр соединения.
#[derive(Debug, Clone, Default)]
pub struct WebRtcTransportFactory {
    config: WebRtcConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: WebRtcConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaTransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Arc<dyn MediaTransport>, MediaError> {
        let transport = WebRtcMediaTransport::new(&self.config, events).await?;
        Ok(Arc::new(transport))
    }
}
