use std::sync::Arc;

use duet_core::NegotiationError;
use duet_peer::{LocalBus, SessionError};

use crate::integration::init_tracing;
use crate::utils::{DeniedMediaSource, MockMediaFactory, Participant, ROOM, join};

#[tokio::test]
async fn test_denied_media_fails_start() {
    init_tracing();

    let bus = LocalBus::default();
    let factory = MockMediaFactory::new();

    let result = join(
        &bus,
        Participant::owner(Arc::new(factory.clone())).with_media(Arc::new(DeniedMediaSource)),
    )
    .await;

    let err = result.err().expect("Start should fail");
    let session_err = err
        .downcast_ref::<SessionError>()
        .expect("Not a session error");
    assert!(matches!(
        session_err,
        SessionError::Negotiation(NegotiationError::MediaAccessDenied(_))
    ));

    // No transport was created and the member left the channel.
    assert_eq!(factory.created(), 0);
    assert!(bus.members(ROOM).is_empty());
}
