//! Looping demonstration of the champion on an isolated agent.

use crate::agent::Agent;
use crate::config::{EnvironmentConfig, FitnessConfig};
use crate::neural::Genome;

/// Isolated agent driven by a frozen genome. Its fitness is display-only
/// and never flows back into selection.
#[derive(Debug, Clone)]
pub struct Playback {
    agent: Agent,
    elapsed: f32,
    active: bool,
    loops: u64,
}

impl Playback {
    pub fn new(env: &EnvironmentConfig) -> Self {
        Self {
            agent: Agent::new(env),
            elapsed: 0.0,
            active: false,
            loops: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Seconds since the current loop started
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Completed loops since the last activation
    pub fn loops(&self) -> u64 {
        self.loops
    }

    /// Reset the agent and mark the session inactive, so the next step
    /// starts from scratch
    pub fn invalidate(&mut self, env: &EnvironmentConfig) {
        self.agent.reset(env);
        self.elapsed = 0.0;
        self.active = false;
        self.loops = 0;
    }

    /// Start a session from the initial state unless one is already running
    pub fn activate(&mut self, env: &EnvironmentConfig) {
        if !self.active {
            self.invalidate(env);
            self.active = true;
        }
    }

    /// Step the agent once with `genome`, restarting it whenever a loop of
    /// `loop_duration` seconds completes
    pub fn step(
        &mut self,
        genome: &Genome,
        env: &EnvironmentConfig,
        shaping: &FitnessConfig,
        dt: f32,
        loop_duration: f32,
    ) -> &Agent {
        self.activate(env);

        self.agent.step(genome, env, shaping, dt);
        self.elapsed += dt;

        if self.elapsed >= loop_duration {
            self.agent.reset(env);
            self.elapsed = 0.0;
            self.loops += 1;
        }
        &self.agent
    }
}
