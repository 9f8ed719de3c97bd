//! Shared doubles for the in-crate tests.

use std::sync::{Arc, Mutex};

use crate::beacon::{BeaconDispatcher, Scheme};
use crate::host::PlayerHost;

#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Pause,
    Seek(f64),
    Play,
}

#[derive(Debug, Default)]
struct HostState {
    position: f64,
    paused: bool,
    commands: Vec<HostCommand>,
}

/// Player whose position is set by the test. Clones share state, so the test
/// keeps one handle while the session owns another.
#[derive(Debug, Clone)]
pub struct ScriptedHost {
    inner: Arc<Mutex<HostState>>,
    scheme: Scheme,
    user_agent: Option<String>,
    preroll_subsystem: bool,
}

impl ScriptedHost {
    pub fn new(position: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HostState {
                position,
                paused: true,
                commands: Vec::new(),
            })),
            scheme: Scheme::Https,
            user_agent: None,
            preroll_subsystem: false,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn with_preroll_subsystem(mut self, enabled: bool) -> Self {
        self.preroll_subsystem = enabled;
        self
    }

    pub fn set_position(&self, position: f64) {
        self.inner.lock().unwrap().position = position;
    }

    pub fn commands(&self) -> Vec<HostCommand> {
        self.inner.lock().unwrap().commands.clone()
    }
}

impl PlayerHost for ScriptedHost {
    fn current_time(&self) -> f64 {
        self.inner.lock().unwrap().position
    }

    fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }

    fn pause(&mut self) {
        let mut state = self.inner.lock().unwrap();
        state.paused = true;
        state.commands.push(HostCommand::Pause);
    }

    fn seek(&mut self, position_secs: f64) {
        let mut state = self.inner.lock().unwrap();
        state.position = position_secs;
        state.commands.push(HostCommand::Seek(position_secs));
    }

    fn play(&mut self) {
        let mut state = self.inner.lock().unwrap();
        state.paused = false;
        state.commands.push(HostCommand::Play);
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

/// Collects dispatched URLs instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingDispatcher {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl BeaconDispatcher for RecordingDispatcher {
    fn dispatch(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}
