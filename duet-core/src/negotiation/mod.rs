mod machine;
mod state;

pub use machine::Negotiation;
pub use state::{Effect, NegotiationInput, NegotiationState, Step};
