mod delivery;
mod signaling_channel;

pub use delivery::*;
pub use signaling_channel::*;
