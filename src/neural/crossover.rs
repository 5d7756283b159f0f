//! Genetic crossover between genomes.

use super::network::{Genome, MAX_HIDDEN};
use rand::Rng;

impl Genome {
    /// Uniform crossover: every parameter, and the hidden size as a whole,
    /// comes from one parent or the other with equal probability. Inactive
    /// slots are mixed as well.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> Self {
        let hidden = if rng.gen::<bool>() { self.hidden } else { other.hidden };
        let mut pick = |a: f32, b: f32| if rng.gen::<bool>() { a } else { b };

        let mut child = *self;
        child.hidden = hidden;
        for i in 0..MAX_HIDDEN {
            child.b_h[i] = pick(self.b_h[i], other.b_h[i]);
            child.w_out[i] = pick(self.w_out[i], other.w_out[i]);
            for (j, w) in child.w_in[i].iter_mut().enumerate() {
                *w = pick(self.w_in[i][j], other.w_in[i][j]);
            }
        }
        child.b_out = pick(self.b_out, other.b_out);
        child.fitness = 0.0;
        child
    }
}
