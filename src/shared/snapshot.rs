//! Owned view of the trainer that can be sent across threads.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::stats::GenerationStats;
use crate::trainer::{Stage, Trainer};

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSnapshot {
    pub running: bool,
    pub stage: Stage,
    pub generation: u64,
    pub eval_time: f32,
    pub agents: Vec<Agent>,
    pub best_index: usize,
    pub best_fitness: Option<f32>,
    pub gen_best_fitness: Option<f32>,
    pub champion_fitness: Option<f32>,
    /// Champion playback agent while display mode is on
    pub playback: Option<Agent>,
    pub latest_stats: Option<GenerationStats>,
}

impl TrainerSnapshot {
    pub fn from_trainer(trainer: &Trainer) -> Self {
        let view = trainer.agents_snapshot();
        let playback = if trainer.is_playback_active() {
            trainer.champion_agent_snapshot().copied()
        } else {
            None
        };

        Self {
            running: trainer.is_running(),
            stage: trainer.stage(),
            generation: trainer.generation(),
            eval_time: trainer.eval_time(),
            agents: view.agents.to_vec(),
            best_index: view.best_index,
            best_fitness: trainer.best_fitness(),
            gen_best_fitness: trainer.gen_best_fitness(),
            champion_fitness: trainer.champion().map(|c| c.fitness),
            playback,
            latest_stats: trainer.history().latest().cloned(),
        }
    }

    /// Agent currently leading the evaluation
    pub fn best_agent(&self) -> Option<&Agent> {
        self.agents.get(self.best_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_snapshot_from_idle_trainer() {
        let mut config = Config::default();
        config.evaluation.population_size = 5;
        config.evaluation.workers = 1;
        let trainer = Trainer::new_with_seed(config, 3).unwrap();

        let snapshot = TrainerSnapshot::from_trainer(&trainer);
        assert!(!snapshot.running);
        assert_eq!(snapshot.agents.len(), 5);
        assert_eq!(snapshot.stage, Stage::Eval);
        assert!(snapshot.playback.is_none());
        assert!(snapshot.champion_fitness.is_none());
        assert!(snapshot.best_agent().is_some());
    }

    #[test]
    fn test_snapshot_json() {
        let mut config = Config::default();
        config.evaluation.population_size = 2;
        config.evaluation.workers = 1;
        let trainer = Trainer::new_with_seed(config, 4).unwrap();
        let snapshot = TrainerSnapshot::from_trainer(&trainer);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TrainerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
