//! Evolution mechanics and selection.

use crate::config::EvolutionConfig;
use crate::neural::{Genome, Mutation, MutationConfig};
use rand::Rng;
use std::cmp::Ordering;

/// Counts of the mutation kinds applied while building one generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationTally {
    pub noop: usize,
    pub rewire: usize,
    pub add_node: usize,
    pub remove_node: usize,
    pub perturb: usize,
}

impl MutationTally {
    fn record(&mut self, kind: Mutation) {
        match kind {
            Mutation::NoOp => self.noop += 1,
            Mutation::RewireConnection => self.rewire += 1,
            Mutation::AddNode => self.add_node += 1,
            Mutation::RemoveNode => self.remove_node += 1,
            Mutation::PerturbWeights => self.perturb += 1,
        }
    }

    /// Total mutation events
    pub fn total(&self) -> usize {
        self.noop + self.rewire + self.add_node + self.remove_node + self.perturb
    }
}

/// Evolution engine for producing the next generation
#[derive(Debug, Clone)]
pub struct EvolutionEngine {
    pub mutation_config: MutationConfig,
    pub elite_fraction: f32,
    pub weak_fraction: f32,
    pub weak_rate: f32,
    pub weak_strength: f32,
}

/// Descending by fitness; NaN compares equal
fn by_fitness_desc(a: &Genome, b: &Genome) -> Ordering {
    b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal)
}

impl EvolutionEngine {
    /// Create evolution engine from config
    pub fn from_config(config: &EvolutionConfig) -> Self {
        Self {
            mutation_config: MutationConfig::from_config(config),
            elite_fraction: config.elite_fraction,
            weak_fraction: config.weak_fraction,
            weak_rate: config.weak_rate,
            weak_strength: config.weak_sigma,
        }
    }

    /// Number of parents kept unmutated
    pub fn elite_count(&self, population: usize) -> usize {
        ((population as f32 * self.elite_fraction) as usize)
            .max(1)
            .min(population)
    }

    /// First index receiving the extra weak-slot pass. Never inside the elite.
    pub fn weak_start(&self, population: usize) -> usize {
        let weak_start = (population as f32 * (1.0 - self.weak_fraction)) as usize;
        weak_start.max(self.elite_count(population))
    }

    /// Sort the population best-first
    pub fn rank(&self, population: &mut [Genome]) {
        population.sort_by(by_fitness_desc);
    }

    /// Sort the population best-first and apply the same permutation to
    /// `paired`, so that `paired[i]` still belongs to `population[i]`.
    /// Equal fitness keeps the original order.
    pub fn rank_paired<T: Clone>(&self, population: &mut [Genome], paired: &mut [T]) {
        debug_assert_eq!(population.len(), paired.len());
        let mut order: Vec<usize> = (0..population.len().min(paired.len())).collect();
        order.sort_by(|&a, &b| by_fitness_desc(&population[a], &population[b]));

        let genomes: Vec<Genome> = order.iter().map(|&i| population[i]).collect();
        let companions: Vec<T> = order.iter().map(|&i| paired[i].clone()).collect();
        population[..genomes.len()].copy_from_slice(&genomes);
        paired[..companions.len()].clone_from_slice(&companions);
    }

    /// Check that a population is sorted best-first
    pub fn is_ranked(population: &[Genome]) -> bool {
        population
            .windows(2)
            .all(|w| by_fitness_desc(&w[0], &w[1]) != Ordering::Greater)
    }

    /// Replace every non-elite slot of a ranked population with a mutated
    /// crossover child of two elite parents
    pub fn next_generation<R: Rng + ?Sized>(
        &self,
        population: &mut [Genome],
        rng: &mut R,
    ) -> MutationTally {
        let n = population.len();
        let mut tally = MutationTally::default();
        if n == 0 {
            return tally;
        }

        let elite = self.elite_count(n);
        let weak_start = self.weak_start(n);
        let (parents, children) = population.split_at_mut(elite);

        for (offset, child) in children.iter_mut().enumerate() {
            let a = &parents[rng.gen_range(0..elite)];
            let b = &parents[rng.gen_range(0..elite)];
            *child = a.crossover(b, rng);
            tally.record(child.mutate(&self.mutation_config, rng));

            if elite + offset >= weak_start {
                child.mutate_weights(
                    self.weak_rate,
                    self.weak_strength,
                    self.mutation_config.weight_limit,
                    rng,
                );
            }
        }

        tally
    }
}
