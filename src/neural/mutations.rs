//! Genome mutations.

use super::network::{Genome, INPUTS, MAX_HIDDEN, MIN_HIDDEN};
use crate::config::EvolutionConfig;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// A single mutation event applied to a freshly crossed genome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Leave the child untouched
    NoOp,
    /// Replace one input or output weight with a fresh random value
    RewireConnection,
    /// Append a hidden unit with fresh parameters
    AddNode,
    /// Drop the last hidden unit
    RemoveNode,
    /// Perturb every weight and bias independently
    PerturbWeights,
}

/// Configuration for mutation operations
#[derive(Clone, Debug)]
pub struct MutationConfig {
    /// Probability of perturbing each parameter
    pub weight_mutation_rate: f32,
    /// Magnitude of weight perturbations
    pub weight_mutation_strength: f32,
    /// Parameters are clamped to +/- this value after perturbation
    pub weight_limit: f32,
    sampler: MutationSampler,
}

#[derive(Clone, Debug)]
struct MutationSampler {
    kinds: Vec<Mutation>,
    index: Option<WeightedIndex<f32>>,
}

impl MutationSampler {
    /// Build a sampler, leaving out kinds with zero weight. Falls back to
    /// pure perturbation when every weight is zero.
    fn new(weights: &[(Mutation, f32)]) -> Self {
        let (kinds, w): (Vec<Mutation>, Vec<f32>) = weights
            .iter()
            .copied()
            .filter(|(_, w)| w.is_finite() && *w > 0.0)
            .unzip();

        Self {
            kinds,
            index: WeightedIndex::new(&w).ok(),
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Mutation {
        match &self.index {
            Some(index) => self.kinds[index.sample(rng)],
            None => Mutation::PerturbWeights,
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self::from_config(&EvolutionConfig::default())
    }
}

impl MutationConfig {
    pub fn from_config(config: &EvolutionConfig) -> Self {
        let w = &config.mutation_weights;
        Self {
            weight_mutation_rate: config.mutation_rate,
            weight_mutation_strength: config.mutation_sigma,
            weight_limit: config.weight_limit,
            sampler: MutationSampler::new(&[
                (Mutation::NoOp, w.noop),
                (Mutation::RewireConnection, w.rewire),
                (Mutation::AddNode, w.add_node),
                (Mutation::PerturbWeights, w.perturb),
                (Mutation::RemoveNode, w.remove_node),
            ]),
        }
    }

    /// Draw one mutation kind from the weighted distribution
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Mutation {
        self.sampler.sample(rng)
    }
}

impl Genome {
    /// Draw one mutation event and apply it. Returns the kind that was
    /// actually performed, after capacity fallbacks.
    pub fn mutate<R: Rng + ?Sized>(&mut self, config: &MutationConfig, rng: &mut R) -> Mutation {
        let kind = config.sample(rng);
        self.apply_mutation(kind, config, rng)
    }

    /// Apply a specific mutation kind
    pub fn apply_mutation<R: Rng + ?Sized>(
        &mut self,
        kind: Mutation,
        config: &MutationConfig,
        rng: &mut R,
    ) -> Mutation {
        match kind {
            Mutation::NoOp => Mutation::NoOp,
            Mutation::RewireConnection => {
                self.rewire_connection(rng);
                Mutation::RewireConnection
            }
            Mutation::AddNode if self.hidden < MAX_HIDDEN => {
                self.add_node(rng);
                Mutation::AddNode
            }
            Mutation::RemoveNode if self.hidden > MIN_HIDDEN => {
                self.hidden -= 1;
                Mutation::RemoveNode
            }
            Mutation::AddNode | Mutation::RemoveNode | Mutation::PerturbWeights => {
                self.mutate_weights(
                    config.weight_mutation_rate,
                    config.weight_mutation_strength,
                    config.weight_limit,
                    rng,
                );
                Mutation::PerturbWeights
            }
        }
    }

    /// Perturb each weight and bias with probability `rate` by uniform noise
    /// in `[-strength, strength]`
    pub fn mutate_weights<R: Rng + ?Sized>(
        &mut self,
        rate: f32,
        strength: f32,
        limit: f32,
        rng: &mut R,
    ) {
        let mut perturb = |v: &mut f32| {
            if rng.gen::<f32>() < rate {
                *v = (*v + rng.gen_range(-strength..=strength)).clamp(-limit, limit);
            }
        };

        for i in 0..MAX_HIDDEN {
            perturb(&mut self.b_h[i]);
            perturb(&mut self.w_out[i]);
            for w in self.w_in[i].iter_mut() {
                perturb(w);
            }
        }
        perturb(&mut self.b_out);
    }

    /// Replace one active input or output weight with a fresh value
    pub fn rewire_connection<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let unit = rng.gen_range(0..self.hidden);
        let slot = rng.gen_range(0..=INPUTS);
        let value = rng.gen_range(-1.0..=1.0);
        if slot == INPUTS {
            self.w_out[unit] = value;
        } else {
            self.w_in[unit][slot] = value;
        }
    }

    /// Append a hidden unit. No-op at capacity.
    pub fn add_node<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.hidden >= MAX_HIDDEN {
            return;
        }
        let unit = self.hidden;
        self.randomize_unit(unit, rng);
        self.hidden += 1;
    }
}
