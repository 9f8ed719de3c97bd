//! Recurring timer capability used by the beacon scheduler.
//!
//! A timer implementation holds at most one armed recurring timer: scheduling
//! replaces whatever was armed before. Every schedule hands out a fresh
//! [`TimerToken`], so ticks from a cancelled timer can be told apart and
//! ignored.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

pub trait Timer {
    /// Arms a recurring timer firing every `period`, first one `period` from now.
    fn schedule(&mut self, period: Duration) -> TimerToken;

    /// Disarms the timer identified by `token`. Unknown tokens are ignored.
    fn cancel(&mut self, token: TimerToken);

    fn is_armed(&self) -> bool;
}

/// Timer backed by the tokio clock.
///
/// Late ticks are not caught up: after a stall the next tick is delayed
/// rather than fired in a burst.
#[derive(Debug, Default)]
pub struct TokioTimer {
    issued: u64,
    armed: Option<(TimerToken, Interval)>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the next tick of the armed timer. Pends forever while nothing
    /// is armed, which makes it safe to use as a `select!` branch.
    pub async fn tick(&mut self) -> TimerToken {
        match self.armed.as_mut() {
            Some((token, interval)) => {
                interval.tick().await;
                *token
            }
            None => std::future::pending().await,
        }
    }
}

impl Timer for TokioTimer {
    fn schedule(&mut self, period: Duration) -> TimerToken {
        self.issued += 1;
        let token = TimerToken(self.issued);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.armed = Some((token, interval));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if matches!(&self.armed, Some((armed, _)) if *armed == token) {
            self.armed = None;
        }
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

/// Deterministic timer driven by an explicit virtual clock.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now: Duration,
    issued: u64,
    armed: Option<ManualEntry>,
}

#[derive(Debug)]
struct ManualEntry {
    token: TimerToken,
    period: Duration,
    next_due: Duration,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.now
    }

    /// Moves virtual time forward and returns the ticks that fell due, in order.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerToken> {
        let target = self.now + by;
        let mut fired = Vec::new();
        if let Some(entry) = self.armed.as_mut() {
            while entry.next_due <= target {
                fired.push(entry.token);
                entry.next_due += entry.period;
            }
        }
        self.now = target;
        fired
    }
}

impl Timer for ManualTimer {
    fn schedule(&mut self, period: Duration) -> TimerToken {
        self.issued += 1;
        let token = TimerToken(self.issued);
        self.armed = Some(ManualEntry {
            token,
            period,
            next_due: self.now + period,
        });
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if matches!(&self.armed, Some(entry) if entry.token == token) {
            self.armed = None;
        }
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
