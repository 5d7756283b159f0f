//! Genome layout and forward propagation.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Network inputs: cart position, sin(theta), cos(theta), angular velocity
pub const INPUTS: usize = 4;
/// Hidden unit capacity of every genome
pub const MAX_HIDDEN: usize = 8;
/// Smallest hidden layer a genome may shrink to
pub const MIN_HIDDEN: usize = 2;

/// Fixed-capacity single-hidden-layer controller.
///
/// Only the first `hidden` units take part in the forward pass. The
/// remaining slots keep whatever values they last held so that growing the
/// hidden layer never reallocates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub hidden: usize,
    pub w_in: [[f32; INPUTS]; MAX_HIDDEN],
    pub b_h: [f32; MAX_HIDDEN],
    pub w_out: [f32; MAX_HIDDEN],
    pub b_out: f32,
    pub fitness: f32,
}

impl Default for Genome {
    fn default() -> Self {
        Self::zeroed(MIN_HIDDEN)
    }
}

impl Genome {
    /// All-zero genome with the given hidden size (clamped into range)
    pub fn zeroed(hidden: usize) -> Self {
        Self {
            hidden: hidden.clamp(MIN_HIDDEN, MAX_HIDDEN),
            w_in: [[0.0; INPUTS]; MAX_HIDDEN],
            b_h: [0.0; MAX_HIDDEN],
            w_out: [0.0; MAX_HIDDEN],
            b_out: 0.0,
            fitness: 0.0,
        }
    }

    /// Random topology and weights
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut genome = Self::zeroed(rng.gen_range(MIN_HIDDEN..=MAX_HIDDEN));
        for i in 0..MAX_HIDDEN {
            genome.randomize_unit(i, rng);
        }
        genome.b_out = rng.gen_range(-0.5..=0.5);
        genome
    }

    /// Fresh random parameters for hidden unit `i`
    pub fn randomize_unit<R: Rng + ?Sized>(&mut self, i: usize, rng: &mut R) {
        self.b_h[i] = rng.gen_range(-0.5..=0.5);
        self.w_out[i] = rng.gen_range(-1.0..=1.0);
        for w in self.w_in[i].iter_mut() {
            *w = rng.gen_range(-1.0..=1.0);
        }
    }

    /// Forward pass. The result lies in (-1, 1) for any finite input.
    #[inline]
    pub fn forward(&self, inputs: &[f32; INPUTS]) -> f32 {
        let mut out = self.b_out;
        for i in 0..self.hidden {
            let mut sum = self.b_h[i];
            for (w, x) in self.w_in[i].iter().zip(inputs.iter()) {
                sum += w * x;
            }
            out += self.w_out[i] * sum.tanh();
        }
        out.tanh()
    }

    /// Hidden units in use
    #[inline]
    pub fn complexity(&self) -> usize {
        self.hidden
    }

    /// Parameters taking part in the forward pass
    pub fn parameter_count(&self) -> usize {
        self.hidden * (INPUTS + 2) + 1
    }

    /// Check the hidden-size invariant and that no parameter is NaN/Inf
    pub fn is_valid(&self) -> bool {
        (MIN_HIDDEN..=MAX_HIDDEN).contains(&self.hidden)
            && self.b_out.is_finite()
            && self.b_h.iter().all(|b| b.is_finite())
            && self.w_out.iter().all(|w| w.is_finite())
            && self.w_in.iter().flatten().all(|w| w.is_finite())
    }
}
