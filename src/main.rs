use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tns_heartbeat::beacon::{BeaconDispatcher, HttpDispatcher, LogDispatcher};
use tns_heartbeat::configuration::HeartbeatConfig;
use tns_heartbeat::error_handling::SessionError;
use tns_heartbeat::session_management::{run, HeartbeatSession, PlaybackEvent, TokioTimer};
use tns_heartbeat::{PlayerHost, SimulatedPlayer, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "tns-heartbeat")]
#[command(version)]
#[command(about = "Plays a simulated video and emits TNS heartbeat beacons for it")]
struct Args {
    /// TOML file with the counter options
    #[arg(env = "TNS_HEARTBEAT_CONFIG")]
    config_file: PathBuf,

    /// How long the simulated playback lasts, in seconds
    #[arg(long, default_value_t = 65)]
    play_secs: u64,

    /// Initial playback position in seconds (negative for a DVR offset)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    start_position: f64,

    /// Announce a pre-roll and its end before playback starts
    #[arg(long)]
    preroll: bool,

    /// Log beacon URLs instead of sending them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn scripted_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        if self.preroll {
            events.push(PlaybackEvent::PrerollExists);
        }
        events.push(PlaybackEvent::Play);
        if self.preroll {
            events.push(PlaybackEvent::AllPrerollsEnded);
        }
        events
    }
}

/// Loads the configuration and attaches a counter to a fresh simulated player.
fn build_session(args: &Args) -> Result<HeartbeatSession<TokioTimer>, SessionError> {
    let config = HeartbeatConfig::from_file(&args.config_file)?;
    info!("Configuration imported successfully");

    let dispatcher: Arc<dyn BeaconDispatcher> = if args.dry_run {
        Arc::new(LogDispatcher)
    } else {
        Arc::new(HttpDispatcher::new())
    };

    let mut player = SimulatedPlayer::new(args.start_position).with_preroll_subsystem(args.preroll);
    player.play();
    let session = HeartbeatSession::new(
        config,
        Box::new(player),
        dispatcher,
        Arc::new(SystemClock),
        TokioTimer::new(),
    )?;
    Ok(session)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let session = build_session(&args).unwrap_or_else(|e| {
        error!("Unable to start the heartbeat counter: {}", e);
        std::process::exit(1);
    });

    let (tx, rx) = mpsc::channel(16);
    let runner = tokio::spawn(run(session, rx));

    for event in args.scripted_events() {
        if tx.send(event).await.is_err() {
            break;
        }
    }
    tokio::time::sleep(Duration::from_secs(args.play_secs)).await;
    let _ = tx.send(PlaybackEvent::Ended).await;

    match runner.await {
        Ok(Ok(session)) => info!("Sent {} beacons", session.beacons_sent()),
        Ok(Err(e)) => {
            error!("Heartbeat session stopped: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Error joining the heartbeat runner: {:?}", e);
            std::process::exit(1);
        }
    }
}
