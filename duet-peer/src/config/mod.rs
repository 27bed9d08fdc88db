mod session_config;
mod webrtc_config;

pub use session_config::*;
pub use webrtc_config::*;
