use std::sync::Arc;
use std::time::Duration;

use duet_core::NegotiationState;
use duet_peer::LocalBus;

use crate::integration::init_tracing;
use crate::utils::{Fault, MockMediaFactory, NEGOTIATION_TIMEOUT_MS, Participant, join};

/// Every chunk sequence reaches both sides last-chunk-first.
#[tokio::test]
async fn test_reversed_chunk_order_still_connects() {
    init_tracing();

    let bus = LocalBus::new(512, 2);
    let factory = Arc::new(MockMediaFactory::with_sdp_padding(2000));

    let owner = join(
        &bus,
        Participant::owner(factory.clone()).with_fault(Fault::ReverseChunks),
    )
    .await
    .expect("Owner failed to join");
    let guest = join(
        &bus,
        Participant::guest(factory).with_fault(Fault::ReverseChunks),
    )
    .await
    .expect("Guest failed to join");

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
