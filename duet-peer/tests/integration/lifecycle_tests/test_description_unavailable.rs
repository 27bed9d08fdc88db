use std::sync::Arc;
use std::time::Duration;

use duet_core::{NegotiationError, NegotiationState, SdpType};
use duet_peer::{LocalBus, SessionError, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{
    MockMediaFactory, NEGOTIATION_TIMEOUT_MS, Participant, collect_events, join, wait_for_event,
};

fn is_error(event: &SessionEvent, expected: fn(&NegotiationError) -> bool) -> bool {
    match event {
        SessionEvent::Error(err) => match &**err {
            SessionError::Negotiation(e) => expected(e),
            _ => false,
        },
        _ => false,
    }
}

fn entered(events: &[SessionEvent], state: NegotiationState) -> bool {
    events
        .iter()
        .any(|e| matches!(e, SessionEvent::StateChanged { to, .. } if *to == state))
}

/// The owner's media layer yields no offer: the transition is aborted and reported.
#[tokio::test]
async fn test_missing_offer_keeps_connection_open() {
    init_tracing();

    let bus = LocalBus::default();
    let mut owner = join(
        &bus,
        Participant::owner(Arc::new(MockMediaFactory::withholding(SdpType::Offer))),
    )
    .await
    .expect("Owner failed to join");
    let mut guest = join(&bus, Participant::guest(Arc::new(MockMediaFactory::new())))
        .await
        .expect("Guest failed to join");

    let mut seen = Vec::new();
    wait_for_event(&mut owner.events, NEGOTIATION_TIMEOUT_MS, |e| {
        seen.push(e.clone());
        is_error(e, |e| matches!(e, NegotiationError::OfferUnavailable))
    })
    .await
    .expect("Owner reported no missing offer");

    assert!(!entered(&seen, NegotiationState::OfferSent));
    assert_eq!(owner.session.state(), NegotiationState::ConnectionOpen);

    // Nothing reached the guest.
    let guest_events = collect_events(&mut guest.events, 200).await;
    assert!(!entered(&guest_events, NegotiationState::OfferApplied));
    assert_eq!(guest.session.state(), NegotiationState::ConnectionOpen);

    guest.session.leave().await.expect("Guest leave failed");
    owner.session.leave().await.expect("Owner leave failed");
}

/// The guest's media layer yields an empty answer: it stays open and publishes nothing.
#[tokio::test]
async fn test_empty_answer_keeps_connection_open() {
    init_tracing();

    let bus = LocalBus::default();
    let mut owner = join(&bus, Participant::owner(Arc::new(MockMediaFactory::new())))
        .await
        .expect("Owner failed to join");
    let mut guest = join(
        &bus,
        Participant::guest(Arc::new(MockMediaFactory::withholding(SdpType::Answer))),
    )
    .await
    .expect("Guest failed to join");

    owner
        .session
        .wait_for_state(
            NegotiationState::OfferSent,
            Duration::from_millis(NEGOTIATION_TIMEOUT_MS),
        )
        .await
        .expect("Owner never sent an offer");

    let mut seen = Vec::new();
    wait_for_event(&mut guest.events, NEGOTIATION_TIMEOUT_MS, |e| {
        seen.push(e.clone());
        is_error(e, |e| matches!(e, NegotiationError::AnswerUnavailable))
    })
    .await
    .expect("Guest reported no missing answer");

    assert!(!entered(&seen, NegotiationState::OfferApplied));
    assert_eq!(guest.session.state(), NegotiationState::ConnectionOpen);

    let owner_events = collect_events(&mut owner.events, 200).await;
    assert!(!entered(&owner_events, NegotiationState::Connected));
    assert_eq!(owner.session.state(), NegotiationState::OfferSent);

    owner.session.leave().await.expect("Owner leave failed");
    guest.session.leave().await.expect("Guest leave failed");
}
