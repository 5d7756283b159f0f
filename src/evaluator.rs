//! Batch evaluation of the population across a fixed worker pool.
//!
//! The population is cut into contiguous, disjoint partitions. Each worker
//! owns the `&mut` slices of its partition for the whole batch, so no
//! locking is needed; the only synchronisation point is the join at the
//! end of the batch. Per-partition winners are reduced in partition order,
//! which makes the result identical to a sequential run.

use crate::agent::Agent;
use crate::config::{EnvironmentConfig, FitnessConfig};
use crate::neural::Genome;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;

/// Best agent of a partition (or of the whole population)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestAgent {
    /// Index into the population
    pub index: usize,
    pub fitness: f32,
}

impl BestAgent {
    /// Keep whichever is better; ties keep `self`
    #[inline]
    fn merge(self, other: Self) -> Self {
        if other.fitness > self.fitness {
            other
        } else {
            self
        }
    }
}

/// Immutable inputs shared by every worker of a batch
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub env: &'a EnvironmentConfig,
    pub shaping: &'a FitnessConfig,
    pub dt: f32,
}

/// Split `0..len` into at most `workers` contiguous ranges. The first
/// `len % workers` ranges receive one extra element.
pub fn partition_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.clamp(1, len.max(1));
    let chunk = len / workers;
    let remainder = len % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let size = chunk + usize::from(w < remainder);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Step every agent of a slice `steps` times, writing fitness back into
/// the paired genome after each step
fn run_partition(
    offset: usize,
    agents: &mut [Agent],
    genomes: &mut [Genome],
    steps: usize,
    ctx: StepContext<'_>,
) -> Option<BestAgent> {
    let mut best: Option<BestAgent> = None;
    for (i, (agent, genome)) in agents.iter_mut().zip(genomes.iter_mut()).enumerate() {
        for _ in 0..steps {
            genome.fitness = agent.step(genome, ctx.env, ctx.shaping, ctx.dt);
        }
        let candidate = BestAgent {
            index: offset + i,
            fitness: genome.fitness,
        };
        best = Some(match best {
            Some(b) => b.merge(candidate),
            None => candidate,
        });
    }
    best
}

/// Single-threaded reference evaluation
pub fn evaluate_sequential(
    agents: &mut [Agent],
    genomes: &mut [Genome],
    steps: usize,
    ctx: StepContext<'_>,
) -> Option<BestAgent> {
    run_partition(0, agents, genomes, steps, ctx)
}

/// Fixed-size worker pool for population batches
pub struct ParallelEvaluator {
    pool: ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for ParallelEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelEvaluator")
            .field("workers", &self.workers)
            .finish()
    }
}

impl ParallelEvaluator {
    /// Build a pool with `workers` threads (at least one)
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pendulum-eval-{}", i))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Advance every agent `steps` times and return the best agent.
    ///
    /// `agents` and `genomes` are paired by index and must have equal length.
    /// Returns `None` only for an empty population.
    pub fn evaluate(
        &self,
        agents: &mut [Agent],
        genomes: &mut [Genome],
        steps: usize,
        ctx: StepContext<'_>,
    ) -> Option<BestAgent> {
        debug_assert_eq!(agents.len(), genomes.len());
        let len = agents.len().min(genomes.len());
        let ranges = partition_ranges(len, self.workers);

        // Carve disjoint mutable partitions
        let mut partitions = Vec::with_capacity(ranges.len());
        let mut agents_rest = &mut agents[..len];
        let mut genomes_rest = &mut genomes[..len];
        for range in &ranges {
            let (a, a_tail) = std::mem::take(&mut agents_rest).split_at_mut(range.len());
            let (g, g_tail) = std::mem::take(&mut genomes_rest).split_at_mut(range.len());
            partitions.push((range.start, a, g));
            agents_rest = a_tail;
            genomes_rest = g_tail;
        }

        log::trace!(
            "evaluating {} agents x {} steps on {} partitions",
            len,
            steps,
            partitions.len()
        );

        let partials: Vec<Option<BestAgent>> = self.pool.install(|| {
            partitions
                .into_par_iter()
                .map(|(offset, a, g)| run_partition(offset, a, g, steps, ctx))
                .collect()
        });

        partials
            .into_iter()
            .flatten()
            .reduce(BestAgent::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn population(n: usize, seed: u64, env: &EnvironmentConfig) -> (Vec<Agent>, Vec<Genome>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let genomes = (0..n).map(|_| Genome::random(&mut rng)).collect();
        let agents = (0..n).map(|_| Agent::new(env)).collect();
        (agents, genomes)
    }

    #[test]
    fn test_partition_ranges_cover_everything() {
        for len in 0..40 {
            for workers in 1..10 {
                let ranges = partition_ranges(len, workers);
                assert!(ranges.len() <= workers.max(1));
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    next = r.end;
                }
                assert_eq!(next, len);
            }
        }
    }

    #[test]
    fn test_partition_remainder_goes_first() {
        let ranges = partition_ranges(10, 4);
        let sizes: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
    }

    #[test]
    fn test_workers_capped_at_population() {
        let ranges = partition_ranges(3, 8);
        assert_eq!(ranges.len(), 3);
        assert!(ranges.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let env = EnvironmentConfig::default();
        let shaping = FitnessConfig::default();
        let ctx = StepContext {
            env: &env,
            shaping: &shaping,
            dt: 1.0 / 120.0,
        };

        let (mut agents_a, mut genomes_a) = population(37, 2024, &env);
        let (mut agents_b, mut genomes_b) = (agents_a.clone(), genomes_a.clone());

        let evaluator = ParallelEvaluator::new(4).unwrap();
        let parallel = evaluator.evaluate(&mut agents_a, &mut genomes_a, 600, ctx);
        let sequential = evaluate_sequential(&mut agents_b, &mut genomes_b, 600, ctx);

        assert_eq!(parallel, sequential);
        assert_eq!(agents_a, agents_b);
        assert_eq!(genomes_a, genomes_b);
    }

    #[test]
    fn test_fitness_written_back() {
        let env = EnvironmentConfig::default();
        let shaping = FitnessConfig::default();
        let ctx = StepContext {
            env: &env,
            shaping: &shaping,
            dt: 0.01,
        };
        let (mut agents, mut genomes) = population(9, 5, &env);
        let evaluator = ParallelEvaluator::new(3).unwrap();
        let best = evaluator.evaluate(&mut agents, &mut genomes, 300, ctx).unwrap();

        for (a, g) in agents.iter().zip(genomes.iter()) {
            assert_eq!(a.fitness, g.fitness);
            assert!(g.fitness >= 0.0);
        }
        let max = genomes.iter().map(|g| g.fitness).fold(f32::MIN, f32::max);
        assert_eq!(best.fitness, max);
        let first_max = genomes.iter().position(|g| g.fitness == max).unwrap();
        assert_eq!(best.index, first_max);
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let env = EnvironmentConfig::default();
        let shaping = FitnessConfig::default();
        let ctx = StepContext {
            env: &env,
            shaping: &shaping,
            dt: 0.01,
        };
        let mut genomes = vec![Genome::zeroed(2); 6];
        let mut agents = vec![Agent::new(&env); 6];
        let evaluator = ParallelEvaluator::new(3).unwrap();
        let best = evaluator.evaluate(&mut agents, &mut genomes, 10, ctx).unwrap();
        assert_eq!(best.index, 0);
    }

    #[test]
    fn test_empty_population() {
        let env = EnvironmentConfig::default();
        let shaping = FitnessConfig::default();
        let ctx = StepContext {
            env: &env,
            shaping: &shaping,
            dt: 0.01,
        };
        let evaluator = ParallelEvaluator::new(2).unwrap();
        assert!(evaluator.evaluate(&mut [], &mut [], 10, ctx).is_none());
    }
}
