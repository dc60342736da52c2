//! DhruvaRepeat - Teach-and-repeat replay for VacuumTiger
//!
//! Loads a recorded teach run and replays it with closed-loop correction.
//!
//! ## Threads
//!
//! - **Replay thread** (~100Hz): samples the recording, tracks anchor
//!   points, publishes commands and reference poses
//! - **Correction workers**: run alignment calls, one at a time
//! - **Console thread**: reads operator commands from stdin
//!
//! ## Usage
//!
//! ```text
//! dhruva-repeat [config.toml] [--teach <dir>]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use dhruva_repeat::correction::{StaticFrameTransforms, resolve_sensor_transform};
use dhruva_repeat::io::console::Console;
use dhruva_repeat::playback::MonotonicClock;
use dhruva_repeat::threads::{create_replay_channel, spawn_replay_thread};
use dhruva_repeat::utils::setup_ctrl_c_handler;
use dhruva_repeat::{
    AlignmentService, CorrectionLoop, OfflineAlignment, PassThroughCorrector, RepeatConfig,
    RepeatError, ReplayLoop, ReplaySink, Result, TeachRecording, TracingSink,
};

const DEFAULT_CONFIG_FILE: &str = "dhruva-repeat.toml";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dhruva_repeat=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        RepeatConfig::load(config_path)?
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
        RepeatConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        info!("Using default configuration");
        RepeatConfig::default()
    };

    if let Some(dir) = args
        .iter()
        .position(|a| a == "--teach")
        .and_then(|i| args.get(i + 1))
    {
        info!("Using teach directory: {}", dir);
        config.teach.directory = PathBuf::from(dir);
    }

    info!("DhruvaRepeat v{}", env!("CARGO_PKG_VERSION"));

    let recording = TeachRecording::load(&config.teach)?;

    let transforms = StaticFrameTransforms::from_config(&config);
    let sensor_to_robot = resolve_sensor_transform(&transforms, &config.frames)?;

    let running = setup_ctrl_c_handler()?;

    // No alignment backend is linked into this binary
    let service: Arc<dyn AlignmentService> = Arc::new(OfflineAlignment);
    warn!("No alignment backend connected; any reading will stop playback");

    let sink: Arc<dyn ReplaySink> = Arc::new(TracingSink);
    let (correction, reports) =
        CorrectionLoop::spawn(&config.correction, sensor_to_robot, service, Arc::clone(&sink))?;

    let (handle, inbox) = create_replay_channel(config.replay.input_capacity);
    let replay = ReplayLoop::new(
        &config,
        recording,
        MonotonicClock,
        correction,
        reports,
        Box::new(PassThroughCorrector::new()),
        sink,
        inbox,
    )?;
    let replay_thread = spawn_replay_thread(replay, Arc::clone(&running))?;

    // Console thread is left detached: it may be blocked on stdin at exit
    let console = Console::new(handle, config.runtime_params());
    thread::Builder::new()
        .name("console".into())
        .spawn(move || console.run(std::io::stdin().lock()))
        .map_err(|e| RepeatError::Thread(format!("Failed to spawn console thread: {}", e)))?;

    info!("Ready. Type 'play' to start, 'help' for commands.");

    let summary = match replay_thread.join() {
        Ok(summary) => summary,
        Err(e) => {
            error!("Replay thread panicked: {:?}", e);
            return Err(RepeatError::Thread("replay thread panicked".to_string()));
        }
    };

    info!(
        "Replay stopped in {} at {:.2}s after {} ticks",
        summary.final_status.as_str(),
        summary.sim_time_secs,
        summary.ticks
    );
    info!(
        "Commands published: {}, anchor switches: {}",
        summary.commands_published, summary.anchor_switches
    );
    info!(
        "Readings: {} aligned, {} dropped, {} failed",
        summary.readings_accepted, summary.readings_dropped, summary.alignment_failures
    );
    if summary.out_of_order_queries > 0 {
        warn!(
            "{} cursor queries went backwards in time",
            summary.out_of_order_queries
        );
    }

    info!("DhruvaRepeat finished");
    Ok(())
}
