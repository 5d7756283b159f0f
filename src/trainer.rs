//! Training context: population, generation stage machine and champion.
//!
//! A generation cycles through three stages:
//!
//! - `Eval`: every agent is advanced with its genome until the configured
//!   evaluation time has elapsed
//! - `Select`: the population is ranked, best fitness figures and the
//!   champion are updated
//! - `Mutate`: the next generation is bred and every agent is reset
//!
//! [`Trainer::advance`] moves through this cycle one call at a time, while
//! [`Trainer::advance_generation`] runs a complete cycle in one batch.

use crate::agent::Agent;
use crate::config::{Config, ConfigError, EnvironmentConfig};
use crate::evaluator::{ParallelEvaluator, StepContext};
use crate::evolution::{EvolutionEngine, MutationTally};
use crate::neural::Genome;
use crate::playback::Playback;
use crate::stats::{GenerationStats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Phase of the generational cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Eval,
    Select,
    Mutate,
}

/// Best genome seen over the whole run, frozen for playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Champion {
    pub genome: Genome,
    pub fitness: f32,
    /// Generation in which it was evaluated
    pub generation: u64,
}

/// Read-only view of the population agents
#[derive(Debug, Clone, Copy)]
pub struct AgentsView<'a> {
    pub agents: &'a [Agent],
    pub population_size: usize,
    /// Agent currently ahead in this evaluation
    pub best_index: usize,
}

/// Outcome of one complete generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub stats: GenerationStats,
    pub champion_replaced: bool,
    pub mutations: MutationTally,
    /// Physics steps each agent took
    pub steps: usize,
}

/// Errors produced by the trainer
#[derive(Debug)]
pub enum TrainerError {
    Config(ConfigError),
    Allocation { requested: usize },
    ThreadPool(rayon::ThreadPoolBuildError),
    Thread(std::io::Error),
    InvalidTimeStep(f32),
    Running,
    NotRunning,
}

impl std::fmt::Display for TrainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Allocation { requested } => {
                write!(f, "Could not allocate storage for {} genomes", requested)
            }
            Self::ThreadPool(e) => write!(f, "Worker pool error: {}", e),
            Self::Thread(e) => write!(f, "Training thread error: {}", e),
            Self::InvalidTimeStep(dt) => write!(f, "Time step must be finite and > 0 (got {})", dt),
            Self::Running => write!(f, "Operation not allowed while training is running"),
            Self::NotRunning => write!(f, "Training has not been started"),
        }
    }
}

impl std::error::Error for TrainerError {}

impl From<ConfigError> for TrainerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for TrainerError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(e)
    }
}

/// Owned GA context
pub struct Trainer {
    config: Config,

    // Population, paired by index
    population: Vec<Genome>,
    agents: Vec<Agent>,

    // Cycle state
    generation: u64,
    stage: Stage,
    running: bool,
    eval_time: f32,
    best_index: usize,
    best_fitness: Option<f32>,
    gen_best_fitness: Option<f32>,

    // Champion and its demonstration
    champion: Option<Champion>,
    playback: Playback,

    engine: EvolutionEngine,
    evaluator: ParallelEvaluator,
    history: StatsHistory,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

/// Upper bound on physics steps in one `advance_generation` batch
pub const MAX_BATCH_STEPS: usize = 1_000_000;

/// Steps needed to cover `duration` seconds at `dt`, at least one. The ratio
/// is shaved by a relative epsilon so an f32 `dt` that is a hair below an
/// exact divisor does not add a step. `None` above [`MAX_BATCH_STEPS`].
fn batch_steps(duration: f32, dt: f32) -> Option<usize> {
    let ratio = f64::from(duration) / f64::from(dt);
    let steps = (ratio - ratio * 1e-6).ceil().max(1.0);
    if steps.is_finite() && steps <= MAX_BATCH_STEPS as f64 {
        Some(steps as usize)
    } else {
        None
    }
}

fn try_vec<T>(len: usize) -> Result<Vec<T>, TrainerError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| TrainerError::Allocation { requested: len })?;
    Ok(v)
}

impl Trainer {
    /// Create a trainer with an entropy seed
    pub fn new(config: Config) -> Result<Self, TrainerError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a trainer with a specific seed for reproducibility.
    ///
    /// Genomes get random topologies and weights; the trainer starts idle.
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, TrainerError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let size = config.evaluation.population_size;
        let env = config.environment;

        let mut population = try_vec(size)?;
        population.extend((0..size).map(|_| Genome::random(&mut rng)));
        let mut agents = try_vec(size)?;
        agents.extend((0..size).map(|_| Agent::new(&env)));

        let workers = config.evaluation.resolved_workers().min(size);
        let evaluator = ParallelEvaluator::new(workers)?;

        log::info!(
            "Trainer initialized: population={}, workers={}, seed={}",
            size,
            evaluator.workers(),
            seed
        );

        Ok(Self {
            engine: EvolutionEngine::from_config(&config.evolution),
            playback: Playback::new(&env),
            config,
            population,
            agents,
            generation: 0,
            stage: Stage::Eval,
            running: false,
            eval_time: 0.0,
            best_index: 0,
            best_fitness: None,
            gen_best_fitness: None,
            champion: None,
            evaluator,
            history: StatsHistory::new(),
            rng,
            seed,
        })
    }

    /// Replace the environment. Only allowed while idle.
    pub fn configure_environment(&mut self, env: EnvironmentConfig) -> Result<(), TrainerError> {
        if self.running {
            return Err(TrainerError::Running);
        }
        if let Err(e) = env.validate() {
            log::warn!("Rejected environment configuration: {}", e);
            return Err(e.into());
        }
        self.config.environment = env;
        self.reset_agents();
        Ok(())
    }

    /// Begin a fresh run over the current genomes
    pub fn start(&mut self) {
        self.running = true;
        self.generation = 0;
        self.best_fitness = None;
        self.gen_best_fitness = None;
        self.champion = None;
        self.history.clear();
        self.playback.invalidate(&self.config.environment);
        self.restart_evaluation();
        log::info!("Training started with {} genomes", self.population.len());
    }

    /// Pause; population and champion are kept
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Training stopped at generation {}", self.generation);
        }
        self.running = false;
    }

    /// Continue after [`Trainer::stop`] without resetting anything
    pub fn resume(&mut self) {
        self.running = true;
    }

    fn clamp_frame_dt(&self, dt: f32) -> f32 {
        if dt.is_finite() {
            dt.clamp(0.0, self.config.evaluation.max_frame_dt)
        } else {
            0.0
        }
    }

    /// One interactive tick of the stage machine. Returns the stage the
    /// trainer is in afterwards.
    pub fn advance(&mut self, dt: f32) -> Stage {
        if !self.running {
            return self.stage;
        }

        match self.stage {
            Stage::Eval => {
                let dt = self.clamp_frame_dt(dt);
                self.eval_time += dt;
                self.evaluate_batch(1, dt);
                if self.eval_time >= self.config.evaluation.eval_duration {
                    log::debug!("Generation {} evaluated, selecting", self.generation);
                    self.stage = Stage::Select;
                }
            }
            Stage::Select => {
                self.select();
            }
            Stage::Mutate => {
                self.mutate();
            }
        }
        self.stage
    }

    /// Run a whole generation (evaluation, selection and breeding) in one
    /// call with step size `dt`. Any partially evaluated generation is
    /// discarded and evaluated again from the start.
    pub fn advance_generation(&mut self, dt: f32) -> Result<GenerationReport, TrainerError> {
        if !self.running {
            return Err(TrainerError::NotRunning);
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(TrainerError::InvalidTimeStep(dt));
        }

        self.restart_evaluation();
        let steps = batch_steps(self.config.evaluation.eval_duration, dt)
            .ok_or(TrainerError::InvalidTimeStep(dt))?;
        self.evaluate_batch(steps, dt);
        self.eval_time = steps as f32 * dt;

        let champion_replaced = self.select();
        let stats = self.history.latest().cloned().unwrap_or_default();
        let mutations = self.mutate();

        Ok(GenerationReport {
            stats,
            champion_replaced,
            mutations,
            steps,
        })
    }

    fn evaluate_batch(&mut self, steps: usize, dt: f32) {
        let ctx = StepContext {
            env: &self.config.environment,
            shaping: &self.config.fitness,
            dt,
        };
        if let Some(best) = self
            .evaluator
            .evaluate(&mut self.agents, &mut self.population, steps, ctx)
        {
            self.best_index = best.index;
        }
    }

    /// Rank the population and update best fitness figures and the champion.
    /// Returns whether the champion was replaced.
    fn select(&mut self) -> bool {
        // Agents travel with their genomes so index pairing survives ranking
        self.engine.rank_paired(&mut self.population, &mut self.agents);
        self.best_index = 0;

        let gen_best = self.population.first().map(|g| g.fitness).unwrap_or(0.0);
        self.gen_best_fitness = Some(gen_best);
        self.best_fitness = Some(self.best_fitness.map_or(gen_best, |b| b.max(gen_best)));

        let replace = match &self.champion {
            Some(champion) => gen_best > champion.fitness,
            None => !self.population.is_empty(),
        };
        if replace {
            self.champion = Some(Champion {
                genome: self.population[0],
                fitness: gen_best,
                generation: self.generation,
            });
            self.playback.invalidate(&self.config.environment);
            log::info!(
                "New champion in generation {}: fitness {:.3} ({} hidden, {} parameters)",
                self.generation,
                gen_best,
                self.population[0].complexity(),
                self.population[0].parameter_count()
            );
        }

        let stats = GenerationStats::from_population(
            self.generation,
            &self.population,
            self.best_fitness.unwrap_or(gen_best),
            self.champion.map(|c| c.fitness),
        );
        if self.generation % self.config.logging.stats_interval == 0 {
            log::info!("{}", stats.summary());
        }
        self.history.record(stats);

        self.stage = Stage::Mutate;
        replace
    }

    /// Breed the next generation and restart evaluation
    fn mutate(&mut self) -> MutationTally {
        let tally = self.engine.next_generation(&mut self.population, &mut self.rng);
        log::debug!("Generation {} bred: {:?}", self.generation, tally);
        self.generation += 1;
        self.restart_evaluation();
        tally
    }

    /// Reset every agent and fitness and go back to the start of `Eval`
    fn restart_evaluation(&mut self) {
        let env = self.config.environment;
        for agent in self.agents.iter_mut() {
            agent.reset(&env);
        }
        for genome in self.population.iter_mut() {
            genome.fitness = 0.0;
        }
        self.eval_time = 0.0;
        self.best_index = 0;
        self.stage = Stage::Eval;
    }

    /// Re-initialize all agents and the evaluation clock, keeping genomes
    /// and the champion. The playback session restarts on its next step.
    pub fn reset_agents(&mut self) {
        self.restart_evaluation();
        self.playback.invalidate(&self.config.environment);
    }

    /// Step the champion demonstration. Returns `None` when there is no
    /// champion yet.
    pub fn step_playback(&mut self, dt: f32) -> Option<&Agent> {
        let champion = self.champion?;
        let dt = self.clamp_frame_dt(dt);
        Some(self.playback.step(
            &champion.genome,
            &self.config.environment,
            &self.config.fitness,
            dt,
            self.config.evaluation.eval_duration,
        ))
    }

    /// Enter or leave display mode. Leaving resets the playback agent so the
    /// next session starts over.
    pub fn set_playback_active(&mut self, active: bool) {
        let env = self.config.environment;
        if active {
            if self.champion.is_some() {
                self.playback.activate(&env);
            }
        } else {
            self.playback.invalidate(&env);
        }
    }

    /// Population agents with the current best index
    pub fn agents_snapshot(&self) -> AgentsView<'_> {
        AgentsView {
            agents: &self.agents,
            population_size: self.population.len(),
            best_index: self.best_index,
        }
    }

    /// The playback agent, if a champion exists
    pub fn champion_agent_snapshot(&self) -> Option<&Agent> {
        self.champion.as_ref().map(|_| self.playback.agent())
    }

    /// Release all storage
    pub fn shutdown(self) {
        log::info!(
            "Trainer shut down after {} generations (best fitness {:?})",
            self.generation,
            self.best_fitness
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Simulated seconds into the current evaluation
    pub fn eval_time(&self) -> f32 {
        self.eval_time
    }

    /// Best fitness of any generation so far
    pub fn best_fitness(&self) -> Option<f32> {
        self.best_fitness
    }

    /// Best fitness of the last ranked generation
    pub fn gen_best_fitness(&self) -> Option<f32> {
        self.gen_best_fitness
    }

    pub fn champion(&self) -> Option<&Champion> {
        self.champion.as_ref()
    }

    pub fn is_playback_active(&self) -> bool {
        self.playback.is_active()
    }

    /// Champion playback session (loop count and elapsed time)
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn history(&self) -> &StatsHistory {
        &self.history
    }

    pub fn workers(&self) -> usize {
        self.evaluator.workers()
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
