//! Commands for controlling the training thread from a presentation layer.

use serde::{Deserialize, Serialize};

/// Commands sent to the training thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerCommand {
    /// Begin a fresh run over the current genomes
    Start,
    /// Pause training, keeping every genome and the champion
    Stop,
    /// Continue after a stop
    Resume,
    /// Whole generations per tick (true) or one frame per tick (false)
    SetFastMode(bool),
    /// Show or hide the champion playback
    SetPlayback(bool),
    /// Restart the current evaluation from the initial state
    ResetAgents,
    /// Shutdown the training thread
    Shutdown,
}

/// Current state of the training thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrainerState {
    /// Training is running
    Running,
    /// Idle or stopped, data kept
    #[default]
    Paused,
    /// Thread has shut down
    Stopped,
}
