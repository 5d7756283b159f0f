//! Per-generation statistics.

use crate::neural::Genome;
use serde::{Deserialize, Serialize};

/// Statistics snapshot taken when a generation is ranked
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation that was just evaluated
    pub generation: u64,
    /// Best fitness of this generation
    pub best_fitness: f32,
    /// Mean fitness of this generation
    pub mean_fitness: f32,
    /// Worst fitness of this generation
    pub worst_fitness: f32,
    /// Best fitness seen in any generation so far
    pub best_ever_fitness: f32,
    /// Fitness of the current champion, if any
    pub champion_fitness: Option<f32>,
    /// Mean hidden units in use
    pub mean_hidden: f32,
    /// Largest hidden layer in the population
    pub max_hidden: usize,
}

impl GenerationStats {
    /// Collect stats from an evaluated population
    pub fn from_population(
        generation: u64,
        population: &[Genome],
        best_ever_fitness: f32,
        champion_fitness: Option<f32>,
    ) -> Self {
        let mut stats = Self {
            generation,
            best_ever_fitness,
            champion_fitness,
            ..Self::default()
        };
        if population.is_empty() {
            return stats;
        }

        let n = population.len() as f32;
        stats.best_fitness = population.iter().map(|g| g.fitness).fold(f32::MIN, f32::max);
        stats.worst_fitness = population.iter().map(|g| g.fitness).fold(f32::MAX, f32::min);
        stats.mean_fitness = population.iter().map(|g| g.fitness).sum::<f32>() / n;
        stats.mean_hidden = population.iter().map(|g| g.complexity() as f32).sum::<f32>() / n;
        stats.max_hidden = population.iter().map(Genome::complexity).max().unwrap_or(0);
        stats
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Gen {:>5} | best {:>8.3} | mean {:>8.3} | worst {:>8.3} | best-ever {:>8.3} | champion {} | hidden {:.2} (max {})",
            self.generation,
            self.best_fitness,
            self.mean_fitness,
            self.worst_fitness,
            self.best_ever_fitness,
            self.champion_fitness
                .map(|f| format!("{:.3}", f))
                .unwrap_or_else(|| "-".to_string()),
            self.mean_hidden,
            self.max_hidden,
        )
    }
}

/// History of generation stats
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    pub records: Vec<GenerationStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn record(&mut self, stats: GenerationStats) {
        self.records.push(stats);
    }

    /// Most recent record
    pub fn latest(&self) -> Option<&GenerationStats> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Best-of-generation fitness over time
    pub fn best_curve(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.best_fitness).collect()
    }

    /// Save history to JSON file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from JSON file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
