//! Configuration system for pendulum-evo training runs.
//!
//! Supports YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub fitness: FitnessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Track geometry and physics constants for the cart-pendulum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Left end of the track (px)
    pub track_left: f32,
    /// Track width (px)
    pub track_width: f32,
    /// Vertical position of the pivot (px, y grows downwards)
    pub pivot_y: f32,
    /// Pendulum rod length (px)
    pub length: f32,
    /// Spring constant pulling the base towards the slider target (1/s^2)
    pub base_k: f32,
    /// Damping of the base spring (1/s)
    pub base_d: f32,
    /// Gravity (px/s^2)
    pub gravity: f32,
    /// Linear angular damping (1/s)
    pub damping: f32,
    /// Angular speed cap (rad/s)
    pub max_angular_speed: f32,
    /// Commanded base speed cap (px/s)
    pub max_base_speed: f32,
    /// Cosine cutoff below which the pendulum counts as balanced
    pub upright_threshold: f32,
    /// Angle every agent starts from (rad, 0 = hanging straight down)
    pub initial_theta: f32,
}

/// Population size and time-stepping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Genomes per generation
    pub population_size: usize,
    /// Simulated seconds each generation is evaluated for
    pub eval_duration: f32,
    /// Step size used by fast (whole generation) training
    pub step_dt: f32,
    /// Upper bound on a single interactive frame delta
    pub max_frame_dt: f32,
    /// Worker threads for batch evaluation (0 = all cores)
    pub workers: usize,
}

/// Genetic operator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Fraction of the sorted population kept as parents
    pub elite_fraction: f32,
    /// Fraction at the bottom that gets an extra perturbation pass
    pub weak_fraction: f32,
    /// Magnitude of ordinary weight perturbations
    pub mutation_sigma: f32,
    /// Per-parameter probability of ordinary perturbation
    pub mutation_rate: f32,
    /// Magnitude of the weak-slot pass
    pub weak_sigma: f32,
    /// Per-parameter probability of the weak-slot pass
    pub weak_rate: f32,
    /// Weights and biases are clamped to +/- this value
    pub weight_limit: f32,
    /// Relative weights of the mutation kinds
    pub mutation_weights: MutationWeights,
}

/// Sampling weights for [`crate::neural::Mutation`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationWeights {
    pub noop: f32,
    pub rewire: f32,
    pub add_node: f32,
    pub perturb: f32,
    #[serde(default)]
    pub remove_node: f32,
}

/// Reward shaping constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Bonus per second for being exactly upright
    pub closeness_bonus: f32,
    /// Angular window (rad) over which the closeness bonus falls to zero
    pub closeness_window: f32,
    /// One-time penalty when the pendulum drops out of the balanced cone
    pub drop_penalty: f32,
    /// Penalty per second for sitting at the track ends
    pub position_penalty: f32,
    /// Penalty per second at full base speed
    pub speed_penalty: f32,
    /// Penalty per second at the angular speed cap
    pub spin_penalty: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Generations between stats log lines
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            track_left: 300.0,
            track_width: 800.0,
            pivot_y: 525.0,
            length: 200.0,
            base_k: 100.0,
            base_d: 12.0,
            gravity: 981.0,
            damping: 0.06,
            max_angular_speed: 12.0,
            max_base_speed: 600.0,
            upright_threshold: -0.7,
            initial_theta: -0.7,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            population_size: 64,
            eval_duration: 12.0,
            step_dt: 1.0 / 120.0,
            max_frame_dt: 0.02,
            workers: 0,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            elite_fraction: 0.3,
            weak_fraction: 0.2,
            mutation_sigma: 0.25,
            mutation_rate: 0.15,
            weak_sigma: 0.05,
            weak_rate: 0.5,
            weight_limit: 5.0,
            mutation_weights: MutationWeights::default(),
        }
    }
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            noop: 0.10,
            rewire: 0.15,
            add_node: 0.10,
            perturb: 0.65,
            remove_node: 0.0,
        }
    }
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            closeness_bonus: 1.0,
            closeness_window: 0.5,
            drop_penalty: 2.0,
            position_penalty: 0.2,
            speed_penalty: 0.1,
            spin_penalty: 0.05,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 1,
            log_level: "info".to_string(),
        }
    }
}

/// Errors produced by loading or validating configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Yaml(e) => write!(f, "YAML error: {}", e),
            Self::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}

fn require_positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be finite and > 0 (got {})", name, value)))
    }
}

fn require_finite(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be finite (got {})", name, value)))
    }
}

fn require_fraction(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be within [0, 1] (got {})", name, value)))
    }
}

impl EnvironmentConfig {
    /// Reject geometry and physics values that would divide by zero or blow up
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("track_width", self.track_width)?;
        require_positive("length", self.length)?;
        require_positive("max_angular_speed", self.max_angular_speed)?;
        require_positive("max_base_speed", self.max_base_speed)?;
        require_finite("track_left", self.track_left)?;
        require_finite("pivot_y", self.pivot_y)?;
        require_finite("base_k", self.base_k)?;
        require_finite("base_d", self.base_d)?;
        require_finite("gravity", self.gravity)?;
        require_finite("damping", self.damping)?;
        require_finite("initial_theta", self.initial_theta)?;
        if !(-1.0..=1.0).contains(&self.upright_threshold) {
            return Err(ConfigError::Invalid(format!(
                "upright_threshold must be a cosine within [-1, 1] (got {})",
                self.upright_threshold
            )));
        }
        Ok(())
    }

    /// Horizontal centre of the track
    #[inline]
    pub fn track_center(&self) -> f32 {
        self.track_left + self.track_width * 0.5
    }

    /// Right end of the track
    #[inline]
    pub fn track_right(&self) -> f32 {
        self.track_left + self.track_width
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::Invalid("population_size must be > 0".to_string()));
        }
        require_positive("eval_duration", self.eval_duration)?;
        require_positive("step_dt", self.step_dt)?;
        require_positive("max_frame_dt", self.max_frame_dt)?;
        Ok(())
    }

    /// Worker count after resolving `0` to the machine's parallelism
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_fraction("elite_fraction", self.elite_fraction)?;
        require_fraction("weak_fraction", self.weak_fraction)?;
        require_fraction("mutation_rate", self.mutation_rate)?;
        require_fraction("weak_rate", self.weak_rate)?;
        require_finite("mutation_sigma", self.mutation_sigma)?;
        require_finite("weak_sigma", self.weak_sigma)?;
        require_positive("weight_limit", self.weight_limit)?;

        let w = &self.mutation_weights;
        let weights = [w.noop, w.rewire, w.add_node, w.perturb, w.remove_node];
        if weights.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(ConfigError::Invalid(
                "mutation weights must be finite and >= 0".to_string(),
            ));
        }
        if weights.iter().sum::<f32>() <= 0.0 {
            return Err(ConfigError::Invalid(
                "at least one mutation weight must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl FitnessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("closeness_window", self.closeness_window)?;
        for (name, value) in [
            ("closeness_bonus", self.closeness_bonus),
            ("drop_penalty", self.drop_penalty),
            ("position_penalty", self.position_penalty),
            ("speed_penalty", self.speed_penalty),
            ("spin_penalty", self.spin_penalty),
        ] {
            require_finite(name, value)?;
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.environment.validate()?;
        self.evaluation.validate()?;
        self.evolution.validate()?;
        self.fitness.validate()?;
        if self.logging.stats_interval == 0 {
            return Err(ConfigError::Invalid("stats_interval must be > 0".to_string()));
        }
        Ok(())
    }
}
