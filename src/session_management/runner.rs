//! Async driver for a heartbeat session.
//!
//! Playback events and timer ticks are handled one at a time on a single
//! task, so ticks never overlap with each other or with event handling. A
//! cancel issued while handling an event drops the pending tick with it.

use log::{info, warn};
use tokio::sync::mpsc::Receiver;

use super::session::HeartbeatSession;
use super::state_machine::PlaybackEvent;
use super::timer::TokioTimer;
use crate::error_handling::types::SessionError;

/// Runs `session` until playback ends. The session is made ready first, so a
/// host that is already playing starts the beacon timer right away.
///
/// Returns the session once an `Ended` event has been processed. If the event
/// channel closes first, the timer is cancelled and
/// [`SessionError::ChannelClosed`] is returned.
pub async fn run(
    mut session: HeartbeatSession<TokioTimer>,
    mut events: Receiver<PlaybackEvent>,
) -> Result<HeartbeatSession<TokioTimer>, SessionError> {
    info!("[{}] Heartbeat runner started", session.id());
    session.ready();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    session.handle_event(event);
                    if session.is_ended() {
                        info!(
                            "[{}] Playback ended after {} beacons",
                            session.id(),
                            session.beacons_sent()
                        );
                        return Ok(session);
                    }
                }
                None => {
                    warn!("[{}] Event channel closed before end of playback", session.id());
                    session.stop();
                    return Err(SessionError::ChannelClosed);
                }
            },
            token = session.timer_mut().tick() => {
                session.on_tick(token);
            }
        }
    }
}
