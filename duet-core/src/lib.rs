pub mod codec;
pub mod model;
pub mod negotiation;

mod error;

pub use codec::{ChunkBuffer, Reassembly, split, split_in_halves};
pub use error::{CodecError, NegotiationError};
pub use model::*;
pub use negotiation::{Effect, Negotiation, NegotiationInput, NegotiationState, Step};
