use std::sync::Arc;
use std::time::Duration;

use duet_core::NegotiationState;
use duet_peer::{LocalBus, SessionError};

use crate::integration::init_tracing;
use crate::utils::{MockMediaFactory, Participant, ROOM, join};

#[tokio::test]
async fn test_leave_twice_is_harmless() {
    init_tracing();

    let bus = LocalBus::default();
    let factory = MockMediaFactory::new();
    let owner = join(&bus, Participant::owner(Arc::new(factory.clone())))
        .await
        .expect("Owner failed to join");
    assert_eq!(bus.members(ROOM).len(), 1);

    owner.session.leave().await.expect("First leave failed");
    owner.session.leave().await.expect("Second leave failed");

    assert_eq!(owner.session.state(), NegotiationState::Closed);
    assert!(bus.members(ROOM).is_empty());
    assert_eq!(factory.closed(), 1);

    let chat = owner.session.send_chat("anyone?").await;
    assert!(matches!(chat, Err(SessionError::Closed)));

    let wait = owner
        .session
        .wait_for_state(NegotiationState::Connected, Duration::from_millis(100))
        .await;
    assert!(wait.is_err());
}
