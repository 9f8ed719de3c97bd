//! Beacon scheduler transitions.
//!
//! [`transition`] is a pure function from the current scheduler state and a
//! playback event to the next state plus the list of [`Effect`]s the session
//! has to carry out. It never touches a timer, a clock or the player itself.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::configuration::PausePolicy;

/// Lifecycle signals coming from the host player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackEvent {
    Play,
    /// Playback actually resumed. Handled like `Play`.
    Playing,
    Pause,
    Ended,
    PrerollExists,
    AllPrerollsEnded,
}

/// Progress of the pre-roll advertisement phase. Both transitions are one-shot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrerollGate {
    #[default]
    NotSignaled,
    Pending,
    Complete,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    WaitingForPrerollGate,
    Active,
    /// Paused with a position snapshot. The timer may still be running,
    /// depending on the pause policy.
    Paused,
    /// Terminal.
    Ended,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub phase: Phase,
    pub gate: PrerollGate,
    pub timer_running: bool,
}

/// Session facts the transitions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    pub live: bool,
    pub pause_policy: PausePolicy,
    /// The host runs an ad framework that will announce the end of pre-rolls.
    pub preroll_subsystem: bool,
}

/// Commands produced by a transition, to be executed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    CancelTimer,
    StartTimer,
    EmitBeacon,
    CapturePauseSnapshot,
    ClearPauseSnapshot,
    /// Pause the host, seek to 0 and resume.
    ResetHostPosition,
}

impl SchedulerState {
    /// Whether the pre-roll phase allows the timer to run.
    pub fn gate_open(&self, ctx: &TransitionContext) -> bool {
        match self.gate {
            PrerollGate::Complete => true,
            PrerollGate::NotSignaled => !ctx.preroll_subsystem,
            PrerollGate::Pending => false,
        }
    }
}

pub fn transition(
    state: SchedulerState,
    event: PlaybackEvent,
    ctx: &TransitionContext,
) -> (SchedulerState, Vec<Effect>) {
    if state.phase == Phase::Ended {
        debug!("Ignoring {:?} after end of playback", event);
        return (state, Vec::new());
    }

    let mut next = state;
    let mut effects = Vec::new();

    match event {
        PlaybackEvent::PrerollExists => {
            if next.gate == PrerollGate::NotSignaled {
                next.gate = PrerollGate::Pending;
                if next.phase == Phase::Idle {
                    next.phase = Phase::WaitingForPrerollGate;
                }
            }
        }
        PlaybackEvent::AllPrerollsEnded => {
            if next.gate == PrerollGate::Complete {
                return (state, effects);
            }
            if next.gate == PrerollGate::Pending && !ctx.live {
                effects.push(Effect::ResetHostPosition);
            }
            next.gate = PrerollGate::Complete;
            request_timer_start(&mut next, &mut effects, ctx);
        }
        PlaybackEvent::Play | PlaybackEvent::Playing => {
            request_timer_start(&mut next, &mut effects, ctx);
        }
        PlaybackEvent::Pause => {
            if matches!(next.phase, Phase::Active) {
                effects.push(Effect::CapturePauseSnapshot);
                if ctx.pause_policy == PausePolicy::Cancel {
                    effects.push(Effect::CancelTimer);
                    next.timer_running = false;
                }
                next.phase = Phase::Paused;
            }
        }
        PlaybackEvent::Ended => {
            effects.push(Effect::CancelTimer);
            next.timer_running = false;
            next.phase = Phase::Ended;
        }
    }

    (next, effects)
}

/// Starts the timer unless the pre-roll gate is closed or a timer already runs.
fn request_timer_start(
    state: &mut SchedulerState,
    effects: &mut Vec<Effect>,
    ctx: &TransitionContext,
) {
    if !state.gate_open(ctx) {
        debug!("Timer start refused: pre-roll phase not complete");
        if state.phase == Phase::Idle {
            state.phase = Phase::WaitingForPrerollGate;
        }
        return;
    }

    if state.phase == Phase::Paused {
        effects.push(Effect::ClearPauseSnapshot);
    }
    state.phase = Phase::Active;

    if !state.timer_running {
        effects.extend([Effect::CancelTimer, Effect::StartTimer, Effect::EmitBeacon]);
        state.timer_running = true;
    }
}
