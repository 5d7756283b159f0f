//! Integration tests for PENDULUM-EVO

use pendulum_evo::config::{EnvironmentConfig, FitnessConfig};
use pendulum_evo::evaluator::{evaluate_sequential, ParallelEvaluator, StepContext};
use pendulum_evo::evolution::EvolutionEngine;
use pendulum_evo::neural::{MAX_HIDDEN, MIN_HIDDEN};
use pendulum_evo::shared::{TrainerCommand, TrainingHandle};
use pendulum_evo::stats::StatsHistory;
use pendulum_evo::{Agent, Config, Genome, Stage, Trainer};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

fn small_config(population: usize) -> Config {
    let mut config = Config::default();
    config.evaluation.population_size = population;
    config.evaluation.eval_duration = 2.0;
    config.evaluation.workers = 4;
    config
}

#[test]
fn test_full_training_cycle() {
    let mut trainer = Trainer::new_with_seed(small_config(24), 12345).unwrap();
    trainer.start();

    let mut best = 0.0f32;
    for generation in 0..8 {
        let report = trainer.advance_generation(1.0 / 60.0).unwrap();
        assert_eq!(report.stats.generation, generation);
        assert!(report.stats.best_ever_fitness >= best);
        best = report.stats.best_ever_fitness;

        for genome in trainer.population() {
            assert!(genome.is_valid());
            assert!(genome.hidden >= MIN_HIDDEN && genome.hidden <= MAX_HIDDEN);
        }
    }

    assert_eq!(trainer.generation(), 8);
    assert_eq!(trainer.history().len(), 8);
    assert_eq!(trainer.champion().map(|c| c.fitness), trainer.best_fitness());
}

#[test]
fn test_advance_generation_from_fresh_start() {
    let mut trainer = Trainer::new_with_seed(small_config(10), 7).unwrap();
    trainer.start();
    let env = trainer.config().environment;

    trainer.advance_generation(0.01).unwrap();

    assert_eq!(trainer.generation(), 1);
    assert_eq!(trainer.eval_time(), 0.0);
    assert_eq!(trainer.stage(), Stage::Eval);
    let fresh = Agent::new(&env);
    for agent in trainer.agents_snapshot().agents {
        assert_eq!(*agent, fresh);
    }
}

#[test]
fn test_interactive_and_fast_mode_agree_on_generation_count() {
    let mut config = small_config(8);
    config.evaluation.eval_duration = 0.2;
    let mut trainer = Trainer::new_with_seed(config, 3).unwrap();
    trainer.start();

    // Interactive: frames until the cycle returns to Eval
    let mut saw_select = false;
    let mut saw_mutate = false;
    for _ in 0..100 {
        match trainer.advance(0.02) {
            Stage::Select => saw_select = true,
            Stage::Mutate => saw_mutate = true,
            Stage::Eval if saw_mutate => break,
            Stage::Eval => {}
        }
    }
    assert!(saw_select && saw_mutate);
    assert_eq!(trainer.generation(), 1);

    trainer.advance_generation(0.02).unwrap();
    assert_eq!(trainer.generation(), 2);
}

#[test]
fn test_pure_bias_population() {
    let env = EnvironmentConfig::default();
    let shaping = FitnessConfig::default();
    let mut genomes: Vec<Genome> = (0..4)
        .map(|_| {
            let mut g = Genome::zeroed(2);
            g.b_out = 0.3;
            g
        })
        .collect();
    let mut agents = vec![Agent::new(&env); 4];

    let evaluator = ParallelEvaluator::new(2).unwrap();
    let ctx = StepContext {
        env: &env,
        shaping: &shaping,
        dt: 1.0 / 120.0,
    };
    evaluator.evaluate(&mut agents, &mut genomes, 1, ctx);

    let expected = 0.3f32.tanh() * env.max_base_speed;
    for agent in &agents {
        assert!((agent.last_control - expected).abs() < 1e-4);
        assert_eq!(*agent, agents[0]);
    }
}

#[test]
fn test_parallel_evaluation_is_deterministic_across_worker_counts() {
    let env = EnvironmentConfig::default();
    let shaping = FitnessConfig::default();
    let ctx = StepContext {
        env: &env,
        shaping: &shaping,
        dt: 1.0 / 120.0,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let genomes: Vec<Genome> = (0..29).map(|_| Genome::random(&mut rng)).collect();
    let agents = vec![Agent::new(&env); 29];

    let mut reference_genomes = genomes.clone();
    let mut reference_agents = agents.clone();
    let reference =
        evaluate_sequential(&mut reference_agents, &mut reference_genomes, 240, ctx).unwrap();

    for workers in [1, 2, 3, 7, 16, 64] {
        let evaluator = ParallelEvaluator::new(workers).unwrap();
        let mut g = genomes.clone();
        let mut a = agents.clone();
        let best = evaluator.evaluate(&mut a, &mut g, 240, ctx).unwrap();
        assert_eq!(best, reference, "workers = {}", workers);
        assert_eq!(g, reference_genomes);
    }
}

#[test]
fn test_agents_stay_on_track() {
    let mut trainer = Trainer::new_with_seed(small_config(16), 2024).unwrap();
    trainer.start();
    let env = trainer.config().environment;

    for _ in 0..200 {
        trainer.advance(0.02);
        for agent in trainer.agents_snapshot().agents {
            assert!(agent.pivot_x >= env.track_left && agent.pivot_x <= env.track_right());
            assert!((0.0..=1.0).contains(&agent.slider_value));
            assert!(agent.omega.abs() <= env.max_angular_speed);
            assert!(agent.fitness >= 0.0);
        }
    }
}

#[test]
fn test_population_sorted_after_select() {
    let mut trainer = Trainer::new_with_seed(small_config(12), 5).unwrap();
    trainer.start();
    while trainer.advance(0.02) != Stage::Select {}
    assert_eq!(trainer.advance(0.02), Stage::Mutate);
    assert!(EvolutionEngine::is_ranked(trainer.population()));
}

#[test]
fn test_config_file_roundtrip() {
    let path = std::env::temp_dir().join("pendulum_evo_integration_config.yaml");
    let mut config = small_config(20);
    config.fitness.drop_penalty = 3.5;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.evaluation.population_size, 20);
    assert_eq!(loaded.fitness.drop_penalty, 3.5);
    assert!(Trainer::new_with_seed(loaded, 1).is_ok());
}

#[test]
fn test_stats_export() {
    let mut trainer = Trainer::new_with_seed(small_config(8), 11).unwrap();
    trainer.start();
    for _ in 0..3 {
        trainer.advance_generation(0.05).unwrap();
    }

    let path = std::env::temp_dir().join("pendulum_evo_integration_stats.json");
    let path = path.to_str().unwrap();
    trainer.history().save(path).unwrap();
    let loaded = StatsHistory::load(path).unwrap();
    std::fs::remove_file(path).ok();

    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.best_curve(), trainer.history().best_curve());
}

#[test]
fn test_background_training_thread() {
    let mut handle = TrainingHandle::spawn(small_config(8), Some(77)).unwrap();
    handle.send(TrainerCommand::SetFastMode(true));
    handle.send(TrainerCommand::Start);

    let deadline = Instant::now() + Duration::from_secs(30);
    let mut reached = false;
    while Instant::now() < deadline {
        if let Some(snapshot) = handle.recv_snapshot_timeout(Duration::from_millis(100)) {
            if snapshot.generation >= 3 {
                assert!(snapshot.champion_fitness.is_some());
                reached = true;
                break;
            }
        }
    }
    assert!(reached);

    handle.send(TrainerCommand::ResetAgents);
    handle.shutdown();
}
