mod reassembly;
mod split;

pub use reassembly::{ChunkBuffer, Reassembly};
pub use split::{split, split_in_halves};
