//! # PENDULUM-EVO
//!
//! Neuroevolution of cart-pendulum swing-up controllers.
//!
//! ## Features
//!
//! - **Evolvable**: one-hidden-layer tanh controllers whose hidden layer grows
//!   and shrinks through structural mutation
//! - **Parallel**: population batches run on a fixed Rayon worker pool with
//!   results identical to a sequential run
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: Seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pendulum_evo::{Config, Trainer};
//!
//! let mut trainer = Trainer::new_with_seed(Config::default(), 42).unwrap();
//! trainer.start();
//!
//! for _ in 0..20 {
//!     let report = trainer.advance_generation(1.0 / 120.0).unwrap();
//!     println!("{}", report.stats.summary());
//! }
//!
//! // Watch the champion
//! if let Some(agent) = trainer.step_playback(1.0 / 60.0) {
//!     println!("theta = {:.3}", agent.theta);
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use pendulum_evo::Config;
//!
//! let mut config = Config::default();
//! config.evaluation.population_size = 128;
//! config.evolution.mutation_sigma = 0.1;
//! assert!(config.validate().is_ok());
//! ```

pub mod agent;
pub mod config;
pub mod evaluator;
pub mod evolution;
pub mod fitness;
pub mod neural;
pub mod playback;
pub mod shared;
pub mod stats;
pub mod trainer;

// Re-export main types
pub use agent::Agent;
pub use config::Config;
pub use neural::Genome;
pub use trainer::{Stage, Trainer, TrainerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark: `generations` whole generations in fast mode
pub fn benchmark(generations: u64, population: usize) -> Result<BenchmarkResult, TrainerError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.evaluation.population_size = population;
    let dt = config.evaluation.step_dt;

    let mut trainer = Trainer::new_with_seed(config, 0)?;
    trainer.start();

    let start = Instant::now();
    for _ in 0..generations {
        trainer.advance_generation(dt)?;
    }
    let elapsed = start.elapsed().as_secs_f64();

    Ok(BenchmarkResult {
        generations,
        population,
        workers: trainer.workers(),
        elapsed_secs: elapsed,
        generations_per_second: if elapsed > 0.0 {
            generations as f64 / elapsed
        } else {
            0.0
        },
        best_fitness: trainer.best_fitness().unwrap_or(0.0),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub generations: u64,
    pub population: usize,
    pub workers: usize,
    pub elapsed_secs: f64,
    pub generations_per_second: f64,
    pub best_fitness: f32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Population: {} on {} workers", self.population, self.workers)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.2} generations/s", self.generations_per_second)?;
        writeln!(f, "Best fitness: {:.3}", self.best_fitness)?;
        Ok(())
    }
}
