mod presence_event;
mod presence_tracker;

pub use presence_event::*;
pub use presence_tracker::*;
