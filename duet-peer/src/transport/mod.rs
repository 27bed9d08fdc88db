mod local_bus;
mod pubsub_transport;
mod transport_event;
mod ws_transport;

pub use local_bus::*;
pub use pubsub_transport::*;
pub use transport_event::*;
pub use ws_transport::*;
