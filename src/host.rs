//! The media player the heartbeat counter is attached to.
//!
//! The counter only needs a narrow view of the player: where playback is,
//! whether it is paused, three transport commands for the post-pre-roll
//! position reset, and a few facts about the embedding page.

use log::debug;
use tokio::time::Instant;

use crate::beacon::Scheme;

pub trait PlayerHost: Send {
    /// Current playback position in seconds. Negative inside a live DVR window.
    fn current_time(&self) -> f64;

    /// Queried once when the counter becomes ready, to pick up playback that
    /// started before it was attached.
    fn is_paused(&self) -> bool;

    fn pause(&mut self);

    fn seek(&mut self, position_secs: f64);

    fn play(&mut self);

    /// Scheme of the page hosting the player; beacons use the same one.
    fn page_scheme(&self) -> Scheme {
        Scheme::Https
    }

    fn user_agent(&self) -> Option<String> {
        None
    }

    /// True when an ad framework drives pre-rolls and will signal the end of
    /// the pre-roll phase. Until it does, the beacon timer stays off.
    fn has_preroll_subsystem(&self) -> bool {
        false
    }
}

/// A stand-in player whose position advances with the tokio clock while it
/// is playing.
#[derive(Debug)]
pub struct SimulatedPlayer {
    base_position: f64,
    playing_since: Option<Instant>,
    scheme: Scheme,
    user_agent: Option<String>,
    preroll_subsystem: bool,
}

impl SimulatedPlayer {
    pub fn new(start_position: f64) -> Self {
        Self {
            base_position: start_position,
            playing_since: None,
            scheme: Scheme::Https,
            user_agent: None,
            preroll_subsystem: false,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_preroll_subsystem(mut self, enabled: bool) -> Self {
        self.preroll_subsystem = enabled;
        self
    }
}

impl PlayerHost for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.base_position + since.elapsed().as_secs_f64(),
            None => self.base_position,
        }
    }

    fn is_paused(&self) -> bool {
        self.playing_since.is_none()
    }

    fn pause(&mut self) {
        self.base_position = self.current_time();
        self.playing_since = None;
        debug!("Simulated player paused at {:.3}s", self.base_position);
    }

    fn seek(&mut self, position_secs: f64) {
        self.base_position = position_secs;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        debug!("Simulated player seeked to {:.3}s", position_secs);
    }

    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            debug!("Simulated player playing from {:.3}s", self.base_position);
        }
    }

    fn page_scheme(&self) -> Scheme {
        self.scheme
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn has_preroll_subsystem(&self) -> bool {
        self.preroll_subsystem
    }
}
