//! Types for driving a trainer from another thread.
//!
//! A presentation layer holds a [`TrainingHandle`], sends it
//! [`TrainerCommand`]s and renders the [`TrainerSnapshot`]s it publishes.

pub mod commands;
pub mod sim_thread;
pub mod snapshot;

pub use commands::{TrainerCommand, TrainerState};
pub use sim_thread::TrainingHandle;
pub use snapshot::TrainerSnapshot;
