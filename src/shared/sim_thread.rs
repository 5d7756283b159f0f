//! Training thread that runs independently from the presentation layer.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::trainer::{Trainer, TrainerError};

use super::commands::{TrainerCommand, TrainerState};
use super::snapshot::TrainerSnapshot;

/// Interactive pacing, roughly one frame per display refresh
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Snapshots buffered for a host that is not draining. Older frames are
/// dropped rather than queued.
const SNAPSHOT_BUFFER: usize = 1;

/// Handle for controlling the training thread
pub struct TrainingHandle {
    /// Thread handle
    thread: Option<JoinHandle<()>>,
    /// Channel to send commands to the trainer
    command_tx: Sender<TrainerCommand>,
    /// Channel to receive snapshots from the trainer
    snapshot_rx: Receiver<TrainerSnapshot>,
    /// Current state
    pub state: TrainerState,
}

impl TrainingHandle {
    /// Build a trainer and move it onto its own thread. The trainer is
    /// constructed here so configuration errors reach the caller.
    pub fn spawn(config: Config, seed: Option<u64>) -> Result<Self, TrainerError> {
        let trainer = match seed {
            Some(seed) => Trainer::new_with_seed(config, seed)?,
            None => Trainer::new(config)?,
        };

        let (command_tx, command_rx) = mpsc::channel();
        let (snapshot_tx, snapshot_rx) = mpsc::sync_channel(SNAPSHOT_BUFFER);

        let thread = thread::Builder::new()
            .name("pendulum-trainer".to_string())
            .spawn(move || run_training(trainer, command_rx, snapshot_tx))
            .map_err(TrainerError::Thread)?;

        Ok(Self {
            thread: Some(thread),
            command_tx,
            snapshot_rx,
            state: TrainerState::Paused,
        })
    }

    /// Send a command to the trainer
    pub fn send(&mut self, command: TrainerCommand) {
        match command {
            TrainerCommand::Start | TrainerCommand::Resume => self.state = TrainerState::Running,
            TrainerCommand::Stop => self.state = TrainerState::Paused,
            TrainerCommand::Shutdown => self.state = TrainerState::Stopped,
            _ => {}
        }
        let _ = self.command_tx.send(command);
    }

    /// Try to receive the latest snapshot (non-blocking)
    pub fn try_recv_snapshot(&self) -> Option<TrainerSnapshot> {
        let mut latest = None;
        // Drain all available snapshots, keep only the latest
        loop {
            match self.snapshot_rx.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Wait for the next snapshot
    pub fn recv_snapshot_timeout(&self, timeout: Duration) -> Option<TrainerSnapshot> {
        self.snapshot_rx.recv_timeout(timeout).ok()
    }

    /// Check if training is running
    pub fn is_running(&self) -> bool {
        self.state == TrainerState::Running
    }

    /// Shutdown the training thread
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.send(TrainerCommand::Shutdown);
            let _ = thread.join();
        }
    }
}

impl Drop for TrainingHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Offer a snapshot without blocking. Returns false when the buffer is
/// full or the host has gone away; that frame is skipped.
fn publish(snapshot_tx: &SyncSender<TrainerSnapshot>, trainer: &Trainer) -> bool {
    match snapshot_tx.try_send(TrainerSnapshot::from_trainer(trainer)) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
    }
}

/// Main training loop running in a separate thread
fn run_training(
    mut trainer: Trainer,
    command_rx: Receiver<TrainerCommand>,
    snapshot_tx: SyncSender<TrainerSnapshot>,
) {
    let mut fast_mode = false;
    let mut playback = false;
    let step_dt = trainer.config().evaluation.step_dt;
    let mut last_frame = Instant::now();

    // Send initial snapshot
    publish(&snapshot_tx, &trainer);

    loop {
        // Process every pending command before the next tick
        loop {
            match command_rx.try_recv() {
                Ok(cmd) => match cmd {
                    TrainerCommand::Start => trainer.start(),
                    TrainerCommand::Stop => trainer.stop(),
                    TrainerCommand::Resume => trainer.resume(),
                    TrainerCommand::SetFastMode(fast) => {
                        log::debug!("Fast mode {}", if fast { "on" } else { "off" });
                        fast_mode = fast;
                    }
                    TrainerCommand::SetPlayback(active) => {
                        playback = active;
                        trainer.set_playback_active(active);
                    }
                    TrainerCommand::ResetAgents => trainer.reset_agents(),
                    TrainerCommand::Shutdown => {
                        trainer.shutdown();
                        return;
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    trainer.shutdown();
                    return;
                }
            }
        }

        let now = Instant::now();
        let frame_dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        if trainer.is_running() && fast_mode {
            if let Err(e) = trainer.advance_generation(step_dt) {
                log::error!("Generation failed: {}", e);
                trainer.stop();
            }
        } else if trainer.is_running() {
            trainer.advance(frame_dt);
        }

        if playback {
            trainer.step_playback(frame_dt);
        }

        publish(&snapshot_tx, &trainer);

        if !(trainer.is_running() && fast_mode) {
            thread::sleep(FRAME_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.evaluation.population_size = 6;
        config.evaluation.eval_duration = 0.5;
        config.evaluation.step_dt = 0.05;
        config.evaluation.workers = 2;
        config
    }

    fn wait_for<F: Fn(&TrainerSnapshot) -> bool>(
        handle: &TrainingHandle,
        predicate: F,
    ) -> Option<TrainerSnapshot> {
        let deadline = Instant::now() + Duration::from_secs(20);
        while Instant::now() < deadline {
            if let Some(snapshot) = handle.recv_snapshot_timeout(Duration::from_millis(100)) {
                if predicate(&snapshot) {
                    return Some(snapshot);
                }
            }
        }
        None
    }

    #[test]
    fn test_publish_drops_frames_when_full() {
        let mut config = small_config();
        config.evaluation.workers = 1;
        let trainer = Trainer::new_with_seed(config, 5).unwrap();
        let (tx, rx) = mpsc::sync_channel(SNAPSHOT_BUFFER);

        assert!(publish(&tx, &trainer));
        for _ in 0..10 {
            assert!(!publish(&tx, &trainer));
        }
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        drop(rx);
        assert!(!publish(&tx, &trainer));
    }

    #[test]
    fn test_undrained_handle_buffers_one_snapshot() {
        let mut handle = TrainingHandle::spawn(small_config(), Some(6)).unwrap();
        thread::sleep(Duration::from_millis(200));
        let latest = handle.try_recv_snapshot();
        assert!(latest.is_some());
        handle.shutdown();
    }

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let mut config = small_config();
        config.evaluation.population_size = 0;
        assert!(TrainingHandle::spawn(config, Some(1)).is_err());
    }

    #[test]
    fn test_initial_snapshot_is_idle() {
        let mut handle = TrainingHandle::spawn(small_config(), Some(2)).unwrap();
        let snapshot = wait_for(&handle, |_| true).unwrap();
        assert!(!snapshot.running);
        assert_eq!(snapshot.generation, 0);
        assert!(!handle.is_running());
        handle.shutdown();
    }

    #[test]
    fn test_fast_mode_produces_generations() {
        let mut handle = TrainingHandle::spawn(small_config(), Some(3)).unwrap();
        handle.send(TrainerCommand::SetFastMode(true));
        handle.send(TrainerCommand::Start);
        assert!(handle.is_running());

        let snapshot = wait_for(&handle, |s| s.generation >= 2).unwrap();
        assert!(snapshot.champion_fitness.is_some());
        assert!(snapshot.latest_stats.is_some());

        handle.send(TrainerCommand::Stop);
        let stopped = wait_for(&handle, |s| !s.running).unwrap();
        assert!(stopped.champion_fitness.is_some());
        handle.shutdown();
        assert_eq!(handle.state, TrainerState::Stopped);
    }

    #[test]
    fn test_playback_snapshot() {
        let mut handle = TrainingHandle::spawn(small_config(), Some(4)).unwrap();
        handle.send(TrainerCommand::SetFastMode(true));
        handle.send(TrainerCommand::Start);
        wait_for(&handle, |s| s.generation >= 1).unwrap();

        handle.send(TrainerCommand::Stop);
        handle.send(TrainerCommand::SetPlayback(true));
        let snapshot = wait_for(&handle, |s| s.playback.is_some()).unwrap();
        assert!(!snapshot.running);
        handle.shutdown();
    }
}
