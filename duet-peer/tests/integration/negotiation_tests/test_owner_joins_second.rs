use std::sync::Arc;
use std::time::Duration;

use duet_core::{MemberId, NegotiationState};
use duet_peer::{LocalBus, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{
    MockMediaFactory, NEGOTIATION_TIMEOUT_MS, Participant, join, wait_for_event,
};

/// The guest waits alone; the owner finds it in the presence snapshot and offers.
#[tokio::test]
async fn test_owner_joining_second_starts_negotiation() {
    init_tracing();

    let bus = LocalBus::default();
    let factory = Arc::new(MockMediaFactory::new());

    let mut guest = join(&bus, Participant::guest(factory.clone()))
        .await
        .expect("Guest failed to join");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(guest.session.state(), NegotiationState::ConnectionOpen);

    let owner = join(&bus, Participant::owner(factory.clone()))
        .await
        .expect("Owner failed to join");

    let timeout = Duration::from_millis(NEGOTIATION_TIMEOUT_MS);
    owner
        .session
        .wait_for_state(NegotiationState::Connected, timeout)
        .await
        .expect("Owner not connected");
    guest
        .session
        .wait_for_state(NegotiationState::Connected, timeout)
        .await
        .expect("Guest not connected");

    let announced = wait_for_event(&mut guest.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::MemberAnnounced(_))
    })
    .await
    .expect("Owner was never announced");
    assert!(matches!(
        announced,
        SessionEvent::MemberAnnounced(id) if id == MemberId::from("owner")
    ));
}
