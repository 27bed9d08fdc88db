use std::sync::Arc;
use std::time::Duration;

use duet_core::{NegotiationState, RoomMember};
use duet_peer::{
    Session, SessionConfig, StaticMediaSource, TransportError, WebRtcConfig,
    WebRtcTransportFactory, WsTransport,
};
use duet_relay::RelayConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{init_tracing, start_relay};

const TIMEOUT: Duration = Duration::from_secs(20);

async fn start_session(url: &str, id: &str, config: SessionConfig) -> anyhow::Result<Session> {
    let (transport, rx) = WsTransport::connect(url, "call", RoomMember::new(id, id)).await?;
    let session = Session::start(
        config,
        Arc::new(transport),
        rx,
        Arc::new(WebRtcTransportFactory::new(WebRtcConfig::local_only())),
        Arc::new(StaticMediaSource::audio_only()),
    )
    .await?;
    Ok(session)
}

#[tokio::test]
async fn test_two_sessions_negotiate_over_relay() {
    init_tracing();

    let (url, server) = start_relay(RelayConfig::default())
        .await
        .expect("Relay failed to start");

    let owner = start_session(&url, "owner", SessionConfig::owner())
        .await
        .expect("Owner failed to join");
    let guest = start_session(&url, "guest", SessionConfig::guest())
        .await
        .expect("Guest failed to join");

    guest
        .wait_for_state(NegotiationState::Connected, TIMEOUT)
        .await
        .expect("Guest never answered");
    owner
        .wait_for_state(NegotiationState::Connected, TIMEOUT)
        .await
        .expect("Owner never applied the answer");

    // The room holds two members; a third connection is refused.
    let third = WsTransport::connect(&url, "call", RoomMember::new("third", "Third")).await;
    assert!(matches!(
        third.err(),
        Some(TransportError::CapacityExceeded { capacity: 2, .. })
    ));

    guest.leave().await.expect("Guest leave failed");
    owner
        .wait_for_state(NegotiationState::Closed, TIMEOUT)
        .await
        .expect("Owner did not tear down");
    owner.leave().await.expect("Owner leave failed");

    server.abort();
}

#[tokio::test]
async fn test_health_endpoint() {
    init_tracing();

    let (url, server) = start_relay(RelayConfig::default())
        .await
        .expect("Relay failed to start");
    let addr = url
        .trim_start_matches("ws://")
        .trim_end_matches("/ws")
        .to_owned();

    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("Connect failed");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("Write failed");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("Read failed");

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));

    server.abort();
}
