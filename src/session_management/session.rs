use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use uuid::Uuid;

use super::state_machine::{
    transition, Effect, Phase, PlaybackEvent, SchedulerState, TransitionContext,
};
use super::timer::{ManualTimer, Timer, TimerToken};
use crate::beacon::{
    reportable_position, round_position, BeaconDispatcher, BeaconParams, BeaconTarget,
};
use crate::clock::{compute_skew, Clock};
use crate::configuration::{DedupPolicy, DeviceType, HeartbeatConfig};
use crate::error_handling::types::ConfigError;
use crate::host::PlayerHost;

/// Playback position frozen at the moment of a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSnapshot {
    /// Rounded raw player position.
    pub position: i64,
    /// Reportable position computed from it.
    pub fts: i64,
}

/// One heartbeat counter attached to one player.
///
/// The session owns the runtime state of the beacon scheduler: it feeds
/// playback events through the pure [`transition`] function, executes the
/// resulting effects against the injected timer, host and dispatcher, and
/// builds a beacon on every timer tick.
///
/// Clock skew against the vendor reference is computed once here and never
/// recomputed, whatever the clock does afterwards.
pub struct HeartbeatSession<T: Timer> {
    /// Correlates log lines of this session.
    id: Uuid,
    config: HeartbeatConfig,
    host: Box<dyn PlayerHost>,
    dispatcher: Arc<dyn BeaconDispatcher>,
    clock: Arc<dyn Clock>,
    timer: T,
    /// Token of the one timer this session may have armed.
    timer_token: Option<TimerToken>,
    target: BeaconTarget,
    device_type: Option<DeviceType>,
    clock_skew: i64,
    state: SchedulerState,
    context: TransitionContext,
    last_reported_position: Option<i64>,
    paused_snapshot: Option<PositionSnapshot>,
    beacons_sent: u64,
}

impl<T: Timer> HeartbeatSession<T> {
    /// Attaches a counter to `host`.
    ///
    /// # Errors
    /// Returns [`ConfigError::NotInRange`] when the beacon interval is zero.
    pub fn new(
        config: HeartbeatConfig,
        host: Box<dyn PlayerHost>,
        dispatcher: Arc<dyn BeaconDispatcher>,
        clock: Arc<dyn Clock>,
        timer: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let clock_skew = compute_skew(clock.now_epoch_seconds(), config.reference_timestamp());
        let device_type = config.resolve_device_type(host.user_agent().as_deref());
        let target = BeaconTarget::from_config(&config, host.page_scheme());
        let context = TransitionContext {
            live: config.live,
            pause_policy: config.pause_policy,
            preroll_subsystem: host.has_preroll_subsystem(),
        };

        info!(
            "[{}] Heartbeat counter enabled: {}",
            id,
            serde_json::to_string(&config).unwrap_or_default()
        );

        Ok(Self {
            id,
            config,
            host,
            dispatcher,
            clock,
            timer,
            timer_token: None,
            target,
            device_type,
            clock_skew,
            state: SchedulerState::default(),
            context,
            last_reported_position: None,
            paused_snapshot: None,
            beacons_sent: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn clock_skew(&self) -> i64 {
        self.clock_skew
    }

    pub fn device_type(&self) -> Option<DeviceType> {
        self.device_type
    }

    pub fn beacons_sent(&self) -> u64 {
        self.beacons_sent
    }

    pub fn last_reported_position(&self) -> Option<i64> {
        self.last_reported_position
    }

    pub fn paused_snapshot(&self) -> Option<PositionSnapshot> {
        self.paused_snapshot
    }

    pub fn is_ended(&self) -> bool {
        self.state.phase == Phase::Ended
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Marks the point where the counter starts listening to the host. A host
    /// that is already playing counts as a `Playing` signal.
    pub fn ready(&mut self) {
        info!("[{}] Heartbeat counter ready", self.id);
        if !self.host.is_paused() {
            debug!("[{}] Host already playing at attach time", self.id);
            self.handle_event(PlaybackEvent::Playing);
        }
    }

    /// Applies one playback lifecycle event.
    pub fn handle_event(&mut self, event: PlaybackEvent) {
        let (next, effects) = transition(self.state, event, &self.context);
        if next.phase != self.state.phase {
            debug!(
                "[{}] {:?}: {:?} -> {:?}",
                self.id, event, self.state.phase, next.phase
            );
        }
        if matches!(event, PlaybackEvent::Play | PlaybackEvent::Playing)
            && next.phase == Phase::WaitingForPrerollGate
        {
            warn!("[{}] Timer start refused, pre-roll phase not complete", self.id);
        }
        self.state = next;

        for effect in effects {
            self.apply(effect);
        }
    }

    /// Handles a timer tick. Ticks of a timer that is no longer armed are
    /// dropped. Returns the URL of the beacon sent, if any.
    pub fn on_tick(&mut self, token: TimerToken) -> Option<String> {
        if self.timer_token != Some(token) || self.is_ended() {
            trace!("[{}] Dropping stale tick {:?}", self.id, token);
            return None;
        }
        self.emit_beacon()
    }

    /// Stops beacon emission without ending the session, e.g. when the host
    /// goes away.
    pub fn stop(&mut self) {
        self.cancel_timer();
        self.state.timer_running = false;
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::CancelTimer => self.cancel_timer(),
            Effect::StartTimer => {
                let period = Duration::from_millis(self.config.interval);
                self.timer_token = Some(self.timer.schedule(period));
                info!("[{}] Beacon timer started every {:?}", self.id, period);
            }
            Effect::EmitBeacon => {
                self.emit_beacon();
            }
            Effect::CapturePauseSnapshot => {
                let snapshot = self.current_position(self.clock.now_epoch_seconds());
                debug!("[{}] Pause snapshot {:?}", self.id, snapshot);
                self.paused_snapshot = Some(snapshot);
            }
            Effect::ClearPauseSnapshot => self.paused_snapshot = None,
            Effect::ResetHostPosition => {
                info!("[{}] Rewinding player to 0 after pre-roll", self.id);
                self.host.pause();
                self.host.seek(0.0);
                self.host.play();
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer_token.take() {
            self.timer.cancel(token);
            info!("[{}] Beacon timer stopped", self.id);
        }
    }

    fn current_position(&self, now: i64) -> PositionSnapshot {
        let raw = self.host.current_time();
        PositionSnapshot {
            position: round_position(raw),
            fts: reportable_position(raw, now, self.clock_skew, self.config.live),
        }
    }

    /// Builds and dispatches one beacon for the current position, honoring the
    /// pause snapshot and the de-duplication policy.
    fn emit_beacon(&mut self) -> Option<String> {
        // one clock read per beacon: a live fts and its vts share the same now
        let vts = self.clock.now_epoch_seconds();
        let snapshot = match (self.state.phase, self.paused_snapshot) {
            (Phase::Paused, Some(frozen)) => frozen,
            _ => self.current_position(vts),
        };

        if self.config.dedup == DedupPolicy::SkipUnchanged
            && self.last_reported_position == Some(snapshot.position)
        {
            trace!(
                "[{}] Position {} unchanged, beacon suppressed",
                self.id,
                snapshot.position
            );
            return None;
        }
        self.last_reported_position = Some(snapshot.position);

        let params = BeaconParams::for_tick(&self.config, self.device_type, snapshot.fts, vts);
        let url = self.target.encode(&params);
        debug!("[{}] Beacon fts={} vts={}: {}", self.id, snapshot.fts, vts, url);

        self.dispatcher.dispatch(&url);
        self.beacons_sent += 1;
        Some(url)
    }
}

impl HeartbeatSession<ManualTimer> {
    /// Moves the virtual timer forward and processes every tick that fell due.
    /// Returns the URLs of the beacons sent.
    pub fn advance(&mut self, by: Duration) -> Vec<String> {
        let fired = self.timer.advance(by);
        fired
            .into_iter()
            .filter_map(|token| self.on_tick(token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::Scheme;
    use crate::clock::ManualClock;
    use crate::configuration::PausePolicy;
    use crate::session_management::state_machine::PrerollGate;
    use crate::test_support::{HostCommand, RecordingDispatcher, ScriptedHost};
    use PlaybackEvent::*;

    struct Harness {
        session: HeartbeatSession<ManualTimer>,
        host: ScriptedHost,
        dispatcher: RecordingDispatcher,
        clock: ManualClock,
    }

    fn harness(config: HeartbeatConfig, host: ScriptedHost, now: i64) -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();
        let dispatcher = RecordingDispatcher::default();
        let clock = ManualClock::new(now);
        let session = HeartbeatSession::new(
            config,
            Box::new(host.clone()),
            Arc::new(dispatcher.clone()),
            Arc::new(clock.clone()),
            ManualTimer::new(),
        )
        .unwrap();
        Harness {
            session,
            host,
            dispatcher,
            clock,
        }
    }

    fn vod_config() -> HeartbeatConfig {
        HeartbeatConfig {
            catid: Some("A".into()),
            account: Some("ACC".into()),
            time_section: Some("sec1".into()),
            interval: 30_000,
            ..Default::default()
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = HeartbeatConfig {
            interval: 0,
            ..Default::default()
        };
        let result = HeartbeatSession::new(
            config,
            Box::new(ScriptedHost::new(0.0)),
            Arc::new(RecordingDispatcher::default()),
            Arc::new(ManualClock::new(0)),
            ManualTimer::new(),
        );
        assert!(matches!(result, Err(ConfigError::NotInRange(_))));
    }

    #[test]
    fn skew_is_computed_once_at_construction() {
        let config = HeartbeatConfig {
            server_timestamp: Some(1000),
            ..vod_config()
        };
        let mut h = harness(config, ScriptedHost::new(0.0), 1010);
        assert_eq!(h.session.clock_skew(), 10);

        h.clock.set(5000);
        h.session.handle_event(Play);
        assert_eq!(h.session.clock_skew(), 10);
    }

    #[test]
    fn play_fires_immediately_then_every_interval() {
        let mut h = harness(vod_config(), ScriptedHost::new(12.4), 1000);
        h.session.handle_event(Play);
        assert_eq!(
            h.dispatcher.urls(),
            vec![
                "https://www.tns-counter.ru/V13a**catid:A:vcver:0:fts:12:vts:1000:evtp:2:dvtp:1\
                 **ACC/ru/UTF-8/tmsec=sec1/"
            ]
        );

        h.host.set_position(42.0);
        h.clock.set(1030);
        assert!(h.session.advance(secs(29)).is_empty());
        let sent = h.session.advance(secs(1));
        assert_eq!(
            sent,
            vec![
                "https://www.tns-counter.ru/V13a**catid:A:vcver:0:fts:42:vts:1030:evtp:2:dvtp:1\
                 **ACC/ru/UTF-8/tmsec=sec1/"
            ]
        );

        assert_eq!(h.session.advance(secs(90)).len(), 3);
        assert_eq!(h.session.beacons_sent(), 5);
    }

    /// Clock that moves one second forward on every read.
    struct SteppingClock(std::sync::atomic::AtomicI64);

    impl Clock for SteppingClock {
        fn now_epoch_seconds(&self) -> i64 {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[test]
    fn ready_picks_up_a_host_that_is_already_playing() {
        let mut host = ScriptedHost::new(8.0);
        host.play();
        let mut h = harness(vod_config(), host, 1000);

        h.session.ready();
        assert_eq!(h.session.state().phase, Phase::Active);
        assert_eq!(h.dispatcher.urls().len(), 1);
        assert!(h.dispatcher.urls()[0].contains(":fts:8:vts:1000:"));

        // a later Play does not restart the running timer
        h.session.handle_event(Play);
        assert_eq!(h.dispatcher.urls().len(), 1);
    }

    #[test]
    fn ready_leaves_a_paused_host_idle() {
        let mut h = harness(vod_config(), ScriptedHost::new(8.0), 1000);
        h.session.ready();
        assert_eq!(h.session.state().phase, Phase::Idle);
        assert!(h.dispatcher.urls().is_empty());
        assert!(!h.session.timer().is_armed());
    }

    #[test]
    fn live_fts_and_vts_share_one_clock_read() {
        let config = HeartbeatConfig {
            live: true,
            ..vod_config()
        };
        let dispatcher = RecordingDispatcher::default();
        let mut session = HeartbeatSession::new(
            config,
            Box::new(ScriptedHost::new(3.0)),
            Arc::new(dispatcher.clone()),
            Arc::new(SteppingClock(std::sync::atomic::AtomicI64::new(2000))),
            ManualTimer::new(),
        )
        .unwrap();

        session.handle_event(Play);
        session.advance(secs(30));

        let urls = dispatcher.urls();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains(":fts:2001:vts:2001:evtp:1"));
        assert!(urls[1].contains(":fts:2002:vts:2002:evtp:1"));
    }

    #[test]
    fn live_beacons_report_skew_corrected_edge_and_dvr_offset() {
        let config = HeartbeatConfig {
            live: true,
            server_timestamp: Some(1000),
            ..vod_config()
        };
        let mut h = harness(config, ScriptedHost::new(5.0), 1010);
        h.clock.set(2000);
        h.session.handle_event(Play);
        assert!(h.dispatcher.urls()[0].contains(":fts:1990:vts:2000:evtp:1"));

        h.host.set_position(-30.0);
        h.session.advance(secs(30));
        assert!(h.dispatcher.urls()[1].contains(":fts:1960:vts:2000:evtp:1"));
    }

    #[test]
    fn page_scheme_and_detected_device_reach_the_url() {
        let host = ScriptedHost::new(1.0)
            .with_scheme(Scheme::Http)
            .with_user_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8)");
        let mut h = harness(vod_config(), host, 1000);
        assert_eq!(h.session.device_type(), Some(DeviceType::Android));

        h.session.handle_event(Play);
        let url = &h.dispatcher.urls()[0];
        assert!(url.starts_with("http://www.tns-counter.ru/V13a**"));
        assert!(url.contains(":evtp:2:dvtp:3**"));
    }

    #[test]
    fn preroll_resets_position_once_and_starts_once() {
        let host = ScriptedHost::new(7.3);
        let mut h = harness(vod_config(), host, 1000);

        h.session.handle_event(PrerollExists);
        h.session.handle_event(Play);
        assert!(h.dispatcher.urls().is_empty());
        assert!(!h.session.timer().is_armed());

        h.session.handle_event(AllPrerollsEnded);
        h.session.handle_event(AllPrerollsEnded);
        h.session.handle_event(Play);

        assert_eq!(
            h.host.commands(),
            vec![HostCommand::Pause, HostCommand::Seek(0.0), HostCommand::Play]
        );
        assert_eq!(h.session.state().gate, PrerollGate::Complete);
        // the reset happens before the first beacon, which reports position 0
        assert_eq!(h.dispatcher.urls().len(), 1);
        assert!(h.dispatcher.urls()[0].contains(":fts:0:"));
        assert_eq!(h.session.advance(secs(30)).len(), 1);
    }

    #[test]
    fn live_preroll_does_not_touch_the_player() {
        let config = HeartbeatConfig {
            live: true,
            ..vod_config()
        };
        let mut h = harness(config, ScriptedHost::new(0.0), 1000);
        h.session.handle_event(PrerollExists);
        h.session.handle_event(AllPrerollsEnded);
        assert!(h.host.commands().is_empty());
        assert_eq!(h.dispatcher.urls().len(), 1);
    }

    #[test]
    fn ad_framework_hosts_wait_for_preroll_phase() {
        let host = ScriptedHost::new(3.0).with_preroll_subsystem(true);
        let mut h = harness(vod_config(), host, 1000);
        h.session.handle_event(Play);
        assert!(h.dispatcher.urls().is_empty());
        assert!(h.session.advance(secs(120)).is_empty());

        h.session.handle_event(AllPrerollsEnded);
        assert!(h.host.commands().is_empty());
        assert_eq!(h.dispatcher.urls().len(), 1);
    }

    #[test]
    fn starting_twice_leaves_a_single_timer() {
        let mut h = harness(vod_config(), ScriptedHost::new(1.0), 1000);
        h.session.handle_event(Play);
        h.session.handle_event(Playing);
        h.session.handle_event(Play);
        assert_eq!(h.dispatcher.urls().len(), 1);
        assert_eq!(h.session.advance(secs(30)).len(), 1);
    }

    #[test]
    fn cancel_policy_stops_beacons_while_paused() {
        let mut h = harness(vod_config(), ScriptedHost::new(10.0), 1000);
        h.session.handle_event(Play);
        h.session.advance(secs(10));
        h.session.handle_event(Pause);
        assert!(!h.session.timer().is_armed());
        assert!(h.session.advance(secs(300)).is_empty());

        h.host.set_position(20.0);
        h.session.handle_event(Play);
        assert_eq!(h.dispatcher.urls().len(), 2);
        assert!(h.dispatcher.urls()[1].contains(":fts:20:"));
        // the new timer counts from the resume, not from the first play
        assert!(h.session.advance(secs(29)).is_empty());
        assert_eq!(h.session.advance(secs(1)).len(), 1);
    }

    #[test]
    fn freeze_policy_reports_snapshot_while_paused() {
        let config = HeartbeatConfig {
            live: true,
            pause_policy: PausePolicy::Freeze,
            ..vod_config()
        };
        let mut h = harness(config, ScriptedHost::new(0.0), 2000);
        h.session.handle_event(Play);
        h.session.handle_event(Pause);
        assert_eq!(
            h.session.paused_snapshot(),
            Some(PositionSnapshot {
                position: 0,
                fts: 2000
            })
        );

        // wall clock keeps moving but the reported position does not
        h.clock.set(2030);
        let sent = h.session.advance(secs(30));
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains(":fts:2000:vts:2030:"));

        h.session.handle_event(Play);
        assert_eq!(h.session.paused_snapshot(), None);
        h.clock.set(2060);
        let sent = h.session.advance(secs(30));
        assert!(sent[0].contains(":fts:2060:vts:2060:"));
    }

    #[test]
    fn skip_unchanged_suppresses_stalled_ticks() {
        let config = HeartbeatConfig {
            dedup: DedupPolicy::SkipUnchanged,
            ..vod_config()
        };
        let mut h = harness(config, ScriptedHost::new(5.2), 1000);
        h.session.handle_event(Play);
        assert_eq!(h.session.last_reported_position(), Some(5));

        // stalled: 5.4 still rounds to 5
        h.host.set_position(5.4);
        assert!(h.session.advance(secs(30)).is_empty());

        h.host.set_position(35.0);
        assert_eq!(h.session.advance(secs(30)).len(), 1);
        assert_eq!(h.session.last_reported_position(), Some(35));
        assert_eq!(h.session.beacons_sent(), 2);
    }

    #[test]
    fn dedup_off_repeats_unchanged_positions() {
        let mut h = harness(vod_config(), ScriptedHost::new(5.0), 1000);
        h.session.handle_event(Play);
        assert_eq!(h.session.advance(secs(60)).len(), 2);
        assert_eq!(h.session.beacons_sent(), 3);
    }

    #[test]
    fn ended_silences_the_session_from_any_state() {
        let prefixes: [&[PlaybackEvent]; 4] =
            [&[], &[Play], &[Play, Pause], &[PrerollExists, Play]];
        for prefix in prefixes {
            let config = HeartbeatConfig {
                pause_policy: PausePolicy::Freeze,
                ..vod_config()
            };
            let mut h = harness(config, ScriptedHost::new(1.0), 1000);
            for event in prefix {
                h.session.handle_event(*event);
            }
            let before = h.dispatcher.urls().len();

            h.session.handle_event(Ended);
            assert!(h.session.is_ended());
            assert!(!h.session.timer().is_armed());
            for event in [Play, Playing, AllPrerollsEnded] {
                h.session.handle_event(event);
            }
            assert!(h.session.advance(secs(600)).is_empty());
            assert_eq!(h.dispatcher.urls().len(), before);
        }
    }

    #[test]
    fn stale_ticks_are_dropped() {
        let mut h = harness(vod_config(), ScriptedHost::new(1.0), 1000);
        h.session.handle_event(Play);
        let stale = h.session.timer_mut().schedule(Duration::from_secs(1));
        h.session.timer_mut().cancel(stale);
        assert_eq!(h.session.on_tick(stale), None);
        assert_eq!(h.dispatcher.urls().len(), 1);
    }

    #[test]
    fn stop_disarms_without_ending() {
        let mut h = harness(vod_config(), ScriptedHost::new(1.0), 1000);
        h.session.handle_event(Play);
        h.session.stop();
        assert!(!h.session.timer().is_armed());
        assert!(!h.session.is_ended());
        assert!(h.session.advance(secs(60)).is_empty());
    }
}
