//! Beacon scheduling for a single playback session.
//!
//! This module provides the scheduler state machine, the timer capability it
//! drives, the session tying both to a player host, and an async runner.

/// Pure scheduler transitions and the playback event vocabulary.
pub mod state_machine;
/// Recurring timer capability and its tokio and virtual implementations.
pub mod timer;
/// Session owning runtime state and executing scheduler effects.
pub mod session;
/// Async event/tick loop.
pub mod runner;

pub use runner::run;
pub use session::{HeartbeatSession, PositionSnapshot};
pub use state_machine::{Effect, Phase, PlaybackEvent, PrerollGate, SchedulerState};
pub use timer::{ManualTimer, Timer, TimerToken, TokioTimer};
