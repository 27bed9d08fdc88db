use std::sync::Arc;
use std::time::Duration;

use duet_core::{CHUNKED_ANSWER, CHUNKED_OFFER, NegotiationState};
use duet_peer::{LocalBus, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{
    MockMediaFactory, NEGOTIATION_TIMEOUT_MS, Participant, join, wait_for_event,
};

/// Descriptions larger than the bus ceiling travel as chunk sequences.
#[tokio::test]
async fn test_large_descriptions_are_chunked_and_reassembled() {
    init_tracing();

    let bus = LocalBus::new(512, 2);
    let factory = Arc::new(MockMediaFactory::with_sdp_padding(3000));

    let mut owner = join(&bus, Participant::owner(factory.clone()))
        .await
        .expect("Owner failed to join");
    let mut guest = join(&bus, Participant::guest(factory))
        .await
        .expect("Guest failed to join");

    let reassembled = wait_for_event(&mut guest.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::ReassemblyCompleted { .. })
    })
    .await
    .expect("Offer was not reassembled");
    assert!(matches!(
        reassembled,
        SessionEvent::ReassemblyCompleted { event } if event == CHUNKED_OFFER
    ));

    let reassembled = wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::ReassemblyCompleted { .. })
    })
    .await
    .expect("Answer was not reassembled");
    assert!(matches!(
        reassembled,
        SessionEvent::ReassemblyCompleted { event } if event == CHUNKED_ANSWER
    ));

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
}
