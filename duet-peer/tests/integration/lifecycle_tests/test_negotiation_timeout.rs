use std::sync::Arc;
use std::time::Duration;

use duet_core::{NegotiationError, NegotiationState};
use duet_peer::{LocalBus, SessionConfig, SessionError, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{MockMediaFactory, NEGOTIATION_TIMEOUT_MS, Participant, join, wait_for_event};

/// The guest never answers; the owner gives up after the configured timeout.
#[tokio::test]
async fn test_offerer_times_out_without_answer() {
    init_tracing();

    let bus = LocalBus::default();
    let (gated, _gate) = MockMediaFactory::gated();

    let config = SessionConfig::owner().with_negotiation_timeout(Duration::from_millis(300));
    let mut owner = join(
        &bus,
        Participant::owner(Arc::new(MockMediaFactory::new())).with_config(config),
    )
    .await
    .expect("Owner failed to join");
    let _guest = join(&bus, Participant::guest(Arc::new(gated)))
        .await
        .expect("Guest failed to join");

    let error = wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        matches!(e, SessionEvent::Error(_))
    })
    .await
    .expect("No timeout reported");
    let SessionEvent::Error(err) = error else {
        unreachable!()
    };
    assert!(matches!(
        err.as_ref(),
        SessionError::Negotiation(NegotiationError::NegotiationTimedOut(_))
    ));

    owner
        .session
        .wait_for_state(NegotiationState::Closed, Duration::from_millis(NEGOTIATION_TIMEOUT_MS))
        .await
        .expect("Owner did not tear down");
}
