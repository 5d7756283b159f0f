//! Reward shaping applied after every physics step.
//!
//! Sustained balance close to the upright pose is rewarded; drift along the
//! track, base speed and spin are penalised continuously, and falling out of
//! the balanced cone costs a one-time penalty.

use crate::agent::Agent;
use crate::config::{EnvironmentConfig, FitnessConfig};
use std::f32::consts::{PI, TAU};

/// Wrapped angular distance between `theta` and the upright pose, in [0, PI]
#[inline]
pub fn upright_deviation(theta: f32) -> f32 {
    let d = (theta - PI).rem_euclid(TAU);
    if d > PI {
        TAU - d
    } else {
        d
    }
}

/// Update `agent.fitness` and `agent.above_time` for a step of length `dt`
pub fn shape(agent: &mut Agent, env: &EnvironmentConfig, cfg: &FitnessConfig, dt: f32) {
    let mut fitness = agent.fitness;

    if agent.is_balanced(env) {
        let closeness = (1.0 - upright_deviation(agent.theta) / cfg.closeness_window).clamp(0.0, 1.0);
        fitness += dt + cfg.closeness_bonus * closeness * dt;
        agent.above_time += dt;
    } else {
        if agent.above_time > 0.0 {
            fitness -= cfg.drop_penalty;
        }
        agent.above_time = 0.0;
    }

    let half_width = env.track_width * 0.5;
    let drift = ((agent.pivot_x - env.track_center()).abs() / half_width).clamp(0.0, 1.0);
    let speed = (agent.pivot_v.abs() / env.max_base_speed).min(1.0);
    let spin = agent.omega.abs() / env.max_angular_speed;

    fitness -= dt * (cfg.position_penalty * drift + cfg.speed_penalty * speed + cfg.spin_penalty * spin);

    agent.fitness = fitness.max(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (EnvironmentConfig, FitnessConfig, Agent) {
        let env = EnvironmentConfig::default();
        let agent = Agent::new(&env);
        (env, FitnessConfig::default(), agent)
    }

    #[test]
    fn test_upright_deviation_wraps() {
        assert!(upright_deviation(PI).abs() < 1e-6);
        assert!(upright_deviation(-PI).abs() < 1e-5);
        assert!((upright_deviation(0.0) - PI).abs() < 1e-6);
        assert!((upright_deviation(PI + 0.2) - 0.2).abs() < 1e-5);
        assert!((upright_deviation(3.0 * PI - 0.2) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_upright_at_center_earns_full_reward() {
        let (env, cfg, mut agent) = setup();
        agent.theta = PI;
        shape(&mut agent, &env, &cfg, 0.1);
        let expected = 0.1 + cfg.closeness_bonus * 0.1;
        assert!((agent.fitness - expected).abs() < 1e-5);
        assert!((agent.above_time - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_closeness_bonus_falls_off() {
        let (env, cfg, mut agent) = setup();
        agent.theta = PI + cfg.closeness_window * 0.5;
        shape(&mut agent, &env, &cfg, 1.0);
        assert!((agent.fitness - (1.0 + 0.5 * cfg.closeness_bonus)).abs() < 1e-4);

        let (env, cfg, mut agent) = setup();
        agent.theta = PI + cfg.closeness_window * 1.5;
        assert!(agent.is_balanced(&env));
        shape(&mut agent, &env, &cfg, 1.0);
        assert!((agent.fitness - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_fitness_never_negative() {
        let (env, cfg, mut agent) = setup();
        agent.theta = 0.0;
        agent.pivot_x = env.track_left;
        agent.pivot_v = env.max_base_speed * 4.0;
        agent.omega = env.max_angular_speed;
        for _ in 0..100 {
            shape(&mut agent, &env, &cfg, 0.5);
            assert_eq!(agent.fitness, 0.0);
        }
    }

    #[test]
    fn test_drop_penalty_applied_once() {
        let (env, cfg, mut agent) = setup();
        agent.fitness = 10.0;

        // Balanced for a few steps
        agent.theta = PI;
        for _ in 0..3 {
            shape(&mut agent, &env, &cfg, 0.1);
        }
        let balanced_fitness = agent.fitness;
        assert!(agent.above_time > 0.0);

        // Falls out of the cone: exactly one penalty
        agent.theta = 0.0;
        shape(&mut agent, &env, &cfg, 0.1);
        assert!((agent.fitness - (balanced_fitness - cfg.drop_penalty)).abs() < 1e-4);
        assert_eq!(agent.above_time, 0.0);

        // Staying out costs nothing more at the centre with no motion
        let after_drop = agent.fitness;
        shape(&mut agent, &env, &cfg, 0.1);
        assert!((agent.fitness - after_drop).abs() < 1e-6);

        // Back in the cone: rewards resume
        agent.theta = PI;
        shape(&mut agent, &env, &cfg, 0.1);
        assert!(agent.fitness > after_drop);
    }

    #[test]
    fn test_no_penalty_without_prior_balance() {
        let (env, cfg, mut agent) = setup();
        agent.fitness = 5.0;
        agent.theta = 0.0;
        shape(&mut agent, &env, &cfg, 0.1);
        assert!((agent.fitness - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_motion_penalties_accumulate() {
        let (env, cfg, mut agent) = setup();
        agent.fitness = 5.0;
        agent.theta = 0.0;
        agent.pivot_x = env.track_right();
        agent.pivot_v = env.max_base_speed;
        agent.omega = env.max_angular_speed;
        shape(&mut agent, &env, &cfg, 1.0);
        let expected = 5.0 - (cfg.position_penalty + cfg.speed_penalty + cfg.spin_penalty);
        assert!((agent.fitness - expected).abs() < 1e-4);
    }
}
