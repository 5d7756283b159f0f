//! Cart-pendulum agent state and dynamics.

use crate::config::{EnvironmentConfig, FitnessConfig};
use crate::fitness;
use crate::neural::{Genome, INPUTS};
use serde::{Deserialize, Serialize};

/// Kinematic and scoring state of one pendulum on its cart.
///
/// Angles are measured from the hanging-down pose with screen coordinates
/// (y grows downwards), so the pendulum is upright around `theta = ±PI`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Agent {
    /// Normalized slider target in [0, 1]
    pub slider_value: f32,
    pub pivot_x: f32,
    pub pivot_v: f32,
    pub theta: f32,
    pub omega: f32,
    /// Derived bob position, only meaningful for drawing
    pub bob_x: f32,
    pub bob_y: f32,
    /// Seconds spent continuously inside the balanced cone
    pub above_time: f32,
    /// Last commanded base velocity (px/s)
    pub last_control: f32,
    pub fitness: f32,
}

impl Agent {
    /// Agent at the start of an evaluation
    pub fn new(env: &EnvironmentConfig) -> Self {
        let mut agent = Self::default();
        agent.reset(env);
        agent
    }

    /// Put the cart at the track centre with the pendulum at its initial angle
    pub fn reset(&mut self, env: &EnvironmentConfig) {
        self.slider_value = 0.5;
        self.pivot_x = env.track_center();
        self.pivot_v = 0.0;
        self.theta = env.initial_theta;
        self.omega = 0.0;
        self.above_time = 0.0;
        self.last_control = 0.0;
        self.fitness = 0.0;
        self.update_bob(env);
    }

    /// Network inputs for the current state
    #[inline]
    pub fn sense(&self, env: &EnvironmentConfig) -> [f32; INPUTS] {
        let position = (self.pivot_x - env.track_left) / env.track_width;
        [
            position * 2.0 - 1.0,
            self.theta.sin(),
            self.theta.cos(),
            self.omega,
        ]
    }

    /// Whether the pendulum is inside the rewarded cone
    #[inline]
    pub fn is_balanced(&self, env: &EnvironmentConfig) -> bool {
        self.theta.cos() < env.upright_threshold
    }

    /// One controller + physics + fitness step. Returns the updated fitness.
    ///
    /// Used for both population evaluation and champion playback; only the
    /// caller decides whether the result is written back to a genome.
    pub fn step(
        &mut self,
        genome: &Genome,
        env: &EnvironmentConfig,
        shaping: &FitnessConfig,
        dt: f32,
    ) -> f32 {
        let control = genome.forward(&self.sense(env)) * env.max_base_speed;
        self.last_control = control;
        self.integrate(control, env, dt);
        fitness::shape(self, env, shaping, dt);
        self.fitness
    }

    /// Advance the cart and pendulum by `dt` under a commanded base velocity
    pub fn integrate(&mut self, control: f32, env: &EnvironmentConfig, dt: f32) {
        self.slider_value = (self.slider_value + control * dt / env.track_width).clamp(0.0, 1.0);

        // Spring-damper pulls the base towards the slider target
        let target_x = env.track_left + env.track_width * self.slider_value;
        let pivot_acc = env.base_k * (target_x - self.pivot_x) - env.base_d * self.pivot_v;
        self.pivot_v += pivot_acc * dt;
        self.pivot_x += self.pivot_v * dt;

        // Inelastic track ends
        if self.pivot_x < env.track_left {
            self.pivot_x = env.track_left;
            self.pivot_v = 0.0;
        }
        if self.pivot_x > env.track_right() {
            self.pivot_x = env.track_right();
            self.pivot_v = 0.0;
        }

        let theta_dd = -(env.gravity / env.length) * self.theta.sin()
            - (pivot_acc / env.length) * self.theta.cos()
            - env.damping * self.omega;
        self.omega = (self.omega + theta_dd * dt)
            .clamp(-env.max_angular_speed, env.max_angular_speed);
        self.theta += self.omega * dt;

        self.update_bob(env);
    }

    fn update_bob(&mut self, env: &EnvironmentConfig) {
        self.bob_x = self.pivot_x + env.length * self.theta.sin();
        self.bob_y = env.pivot_y + env.length * self.theta.cos();
    }
}
