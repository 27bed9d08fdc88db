mod media_event;
mod media_source;
mod media_transport;
mod webrtc_transport;

pub use media_event::*;
pub use media_source::*;
pub use media_transport::*;
pub use webrtc_transport::*;
