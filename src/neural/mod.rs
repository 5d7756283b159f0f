//! Neural controller genomes.
//!
//! Implements fixed-capacity single-hidden-layer networks with:
//! - tanh forward pass
//! - Weight mutations
//! - Structural mutations (add/remove hidden units)
//! - Uniform crossover between genomes

mod network;
mod mutations;
mod crossover;

pub use network::{Genome, INPUTS, MAX_HIDDEN, MIN_HIDDEN};
pub use mutations::{Mutation, MutationConfig};
