use std::sync::Arc;
use std::time::Duration;

use duet_core::NegotiationState;
use duet_peer::{LocalBus, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{
    MockMediaFactory, NEGOTIATION_TIMEOUT_MS, Participant, join, wait_for_event,
};

/// A peer that comes back gets a fresh connection instance and remote stream.
#[tokio::test]
async fn test_rejoin_opens_fresh_instance() {
    init_tracing();

    let bus = LocalBus::default();
    let factory = MockMediaFactory::new();
    let timeout = Duration::from_millis(NEGOTIATION_TIMEOUT_MS);

    let mut owner = join(&bus, Participant::owner(Arc::new(factory.clone())))
        .await
        .expect("Owner failed to join");
    let guest = join(&bus, Participant::guest(Arc::new(factory.clone())))
        .await
        .expect("Guest failed to join");

    owner
        .session
        .wait_for_state(NegotiationState::Connected, timeout)
        .await
        .expect("Owner not connected");
    wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::RemoteTrack(_))
    })
    .await
    .expect("No remote track");
    let first_stream = owner.session.remote_stream();
    assert_eq!(first_stream.len(), 1);

    guest.session.leave().await.expect("Guest leave failed");
    let torn_down = wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::TornDown { .. })
    })
    .await
    .expect("Owner did not tear down");
    let SessionEvent::TornDown { generation: first } = torn_down else {
        unreachable!()
    };
    assert!(owner.session.remote_stream().is_empty());

    let guest = join(&bus, Participant::guest(Arc::new(factory.clone())))
        .await
        .expect("Guest failed to rejoin");

    let connected = wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::StateChanged { to: NegotiationState::Connected, .. })
    })
    .await
    .expect("Owner did not reconnect");
    let SessionEvent::StateChanged { generation: second, .. } = connected else {
        unreachable!()
    };
    assert!(second > first);

    guest
        .session
        .wait_for_state(NegotiationState::Connected, timeout)
        .await
        .expect("Rejoined guest not connected");

    wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::RemoteTrack(_))
    })
    .await
    .expect("No remote track after rejoin");
    let second_stream = owner.session.remote_stream();
    assert_ne!(second_stream.id(), first_stream.id());
    assert_eq!(second_stream.len(), 1);

    assert_eq!(factory.created(), 4);
}
