pub use duet_core::{MemberId, RoomMember, SessionRole};

pub mod model {
    pub use duet_core::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use duet_peer::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use duet_relay::*;
}
