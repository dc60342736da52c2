//! Replay thread: fixed-rate playback of the taught trajectory.
//!
//! Each tick:
//! 1. Drains operator input, parameter updates, readings and correction
//!    reports, and checks the in-flight alignment deadline (every status
//!    change happens here)
//! 2. Samples sim time
//! 3. Advances the anchor track on the reference pose
//! 4. Publishes the corrected command while playing
//! 5. Publishes the reference pose
//!
//! The loop owns the clock, the cursors, the anchor track, the state machine
//! and the corrector. Other threads talk to it only through
//! [`ReplayCommand`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::config::{RepeatConfig, RuntimeParams};
use crate::core::types::{PointCloud2D, Pose2D, Twist2D, secs_to_us};
use crate::correction::{CorrectionLoop, CorrectionReport};
use crate::corrector::MotionCorrector;
use crate::error::{AlignmentError, RepeatError, Result};
use crate::io::sink::{AnchorSwitch, ReplaySink};
use crate::io::teach::TeachRecording;
use crate::playback::{
    AnchorTrack, CursorSampler, MonotonicClock, PlaybackClock, PlaybackEvent,
    PlaybackStateMachine, PlaybackStatus, TimeSource,
};

/// Operator requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    /// Start or resume playing.
    StartPlay,
    /// Stop playing; sim time freezes.
    StopPlay,
    /// Clear an error; playback returns to PAUSE.
    AcknowledgeError,
}

impl OperatorInput {
    fn event(self) -> PlaybackEvent {
        match self {
            OperatorInput::StartPlay => PlaybackEvent::Start,
            OperatorInput::StopPlay => PlaybackEvent::Stop,
            OperatorInput::AcknowledgeError => PlaybackEvent::Acknowledge,
        }
    }
}

/// Messages accepted by the replay thread.
#[derive(Debug, Clone)]
pub enum ReplayCommand {
    /// Operator request.
    Operator(OperatorInput),
    /// Replace the runtime parameters.
    UpdateParams(RuntimeParams),
    /// Live sensor reading, in the sensor frame.
    Reading(PointCloud2D),
    /// Stop the loop.
    Shutdown,
}

/// Sender type for replay commands.
pub type ReplayCommandSender = Sender<ReplayCommand>;

/// Receiver type for replay commands.
pub type ReplayCommandReceiver = Receiver<ReplayCommand>;

/// Create the replay thread's inbox.
pub fn create_replay_channel(capacity: usize) -> (ReplayHandle, ReplayCommandReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (ReplayHandle { tx }, rx)
}

/// Non-blocking front end to the replay thread's inbox.
#[derive(Debug, Clone)]
pub struct ReplayHandle {
    tx: ReplayCommandSender,
}

impl ReplayHandle {
    /// Queue a command. Returns false if the inbox is full or closed.
    pub fn send(&self, command: ReplayCommand) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                tracing::warn!("Replay inbox full, dropped {:?}", CommandKind(&command));
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Replay thread gone, command discarded");
                false
            }
        }
    }

    /// Queue an operator request.
    pub fn operator(&self, input: OperatorInput) -> bool {
        self.send(ReplayCommand::Operator(input))
    }

    /// Queue new runtime parameters.
    pub fn update_params(&self, params: RuntimeParams) -> bool {
        self.send(ReplayCommand::UpdateParams(params))
    }

    /// Queue a sensor reading.
    pub fn submit_reading(&self, reading: PointCloud2D) -> bool {
        self.send(ReplayCommand::Reading(reading))
    }

    /// Ask the replay thread to stop.
    pub fn shutdown(&self) -> bool {
        self.send(ReplayCommand::Shutdown)
    }
}

/// Short description of a command for logs; readings can be large.
struct CommandKind<'a>(&'a ReplayCommand);

impl std::fmt::Debug for CommandKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ReplayCommand::Reading(cloud) => write!(f, "Reading({} points)", cloud.len()),
            other => write!(f, "{:?}", other),
        }
    }
}

/// What the loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking.
    Continue,
    /// The last recorded command has been reached.
    Finished,
    /// Shutdown was requested.
    Shutdown,
}

/// Statistics of a finished replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    /// Ticks executed
    pub ticks: u64,
    /// Corrected commands published (idle commands not included)
    pub commands_published: u64,
    /// Anchor switches published
    pub anchor_switches: u64,
    /// Readings handed to the alignment service
    pub readings_accepted: u64,
    /// Readings dropped because a call was in flight
    pub readings_dropped: u64,
    /// Alignment failures reported
    pub alignment_failures: u64,
    /// Cursor queries that went backwards in time
    pub out_of_order_queries: u64,
    /// Status when the loop stopped
    pub final_status: PlaybackStatus,
    /// Sim time when the loop stopped, in seconds
    pub sim_time_secs: f64,
}

/// Replay loop state, owned by the replay thread.
pub struct ReplayLoop<C: TimeSource = MonotonicClock> {
    tick_interval: Duration,
    lookahead_us: u64,
    clock: PlaybackClock<C>,
    commands: CursorSampler<Twist2D>,
    positions: CursorSampler<Pose2D>,
    anchors: AnchorTrack,
    machine: PlaybackStateMachine,
    // Dropped before `correction`, so a worker never blocks on it at teardown
    reports: Receiver<CorrectionReport>,
    correction: CorrectionLoop,
    inbox: ReplayCommandReceiver,
    corrector: Box<dyn MotionCorrector>,
    sink: Arc<dyn ReplaySink>,
    summary: ReplaySummary,
}

impl<C: TimeSource> ReplayLoop<C> {
    /// Assemble a replay loop in PAUSE at sim time zero.
    ///
    /// Fails if the configuration does not validate or the recording has no
    /// commands, poses or anchors.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &RepeatConfig,
        recording: TeachRecording,
        time_source: C,
        correction: CorrectionLoop,
        reports: Receiver<CorrectionReport>,
        mut corrector: Box<dyn MotionCorrector>,
        sink: Arc<dyn ReplaySink>,
        inbox: ReplayCommandReceiver,
    ) -> Result<Self> {
        config.validate()?;

        let commands = CursorSampler::new("command", recording.commands)?;
        let positions = CursorSampler::new("position", recording.positions)?;
        let anchors = AnchorTrack::new(recording.anchors, config.anchors.heading_weight)?;

        let params = config.runtime_params();
        corrector.update_params(&params);

        Ok(Self {
            tick_interval: config.tick_interval(),
            lookahead_us: secs_to_us(params.lookahead_secs),
            clock: PlaybackClock::new(time_source),
            commands,
            positions,
            anchors,
            machine: PlaybackStateMachine::new(),
            reports,
            correction,
            inbox,
            corrector,
            sink,
            summary: ReplaySummary::default(),
        })
    }

    /// Current playback status.
    pub fn status(&self) -> PlaybackStatus {
        self.machine.status()
    }

    /// Current sim time.
    pub fn sim_time(&self) -> Duration {
        self.clock.now()
    }

    /// Lookahead currently applied to command sampling.
    pub fn lookahead(&self) -> Duration {
        Duration::from_micros(self.lookahead_us)
    }

    /// Name of the anchor being tracked.
    pub fn current_anchor(&self) -> &str {
        self.anchors.current_anchor().name()
    }

    /// The correction loop readings are fed to.
    pub fn correction(&self) -> &CorrectionLoop {
        &self.correction
    }

    /// Run one tick.
    ///
    /// Does nothing once the command cursor sits on the last command, so a
    /// recording with a single command never plays.
    pub fn tick(&mut self) -> TickOutcome {
        if self.commands.is_exhausted() {
            return TickOutcome::Finished;
        }
        if self.drain_inbox() {
            return TickOutcome::Shutdown;
        }
        self.drain_reports();

        let now_us = self.clock.now_us();
        let reference = *self.positions.advance_and_get(now_us, 0);

        if let Some(name) = self.anchors.advance_if_closer(&reference) {
            let switch = AnchorSwitch {
                stamp_us: now_us,
                anchor: name.to_string(),
            };
            self.summary.anchor_switches += 1;
            self.sink.publish_anchor_switch(switch);
        }

        if self.machine.status() == PlaybackStatus::Play {
            let recorded = *self.commands.advance_and_get(now_us, self.lookahead_us);
            let command = self.corrector.correct_command(recorded);
            self.sink.publish_command(command);
            self.summary.commands_published += 1;
        }

        self.sink.publish_reference_pose(reference);
        self.summary.ticks += 1;

        if self.commands.is_exhausted() {
            TickOutcome::Finished
        } else {
            TickOutcome::Continue
        }
    }

    /// Tick at the configured rate until the recording ends, shutdown is
    /// requested or `running` is cleared.
    pub fn run(mut self, running: Arc<AtomicBool>) -> ReplaySummary {
        tracing::info!(
            "Replay thread running at {:.0}Hz ({}ms interval), {} commands, {} anchors",
            1.0 / self.tick_interval.as_secs_f64(),
            self.tick_interval.as_millis(),
            self.commands.len(),
            self.anchors.len()
        );

        loop {
            let loop_start = Instant::now();

            if !running.load(Ordering::Relaxed) {
                tracing::info!("Replay interrupted");
                break;
            }

            match self.tick() {
                TickOutcome::Continue => {}
                TickOutcome::Finished => {
                    tracing::info!(
                        "Replay finished at {:.2}s",
                        self.clock.now().as_secs_f64()
                    );
                    break;
                }
                TickOutcome::Shutdown => {
                    tracing::info!("Replay shutdown requested");
                    break;
                }
            }

            let elapsed = loop_start.elapsed();
            if elapsed < self.tick_interval {
                thread::sleep(self.tick_interval - elapsed);
            } else {
                tracing::trace!("Replay tick overran: {:?}", elapsed);
            }
        }

        self.finish()
    }

    /// Stop playback, wait for in-flight alignment and collect statistics.
    ///
    /// Reports of the last alignment call are still applied, so a failure
    /// that comes in during shutdown shows up in the summary.
    pub fn finish(mut self) -> ReplaySummary {
        if self.machine.status() == PlaybackStatus::Play {
            self.machine
                .handle(PlaybackEvent::Stop, &mut self.clock, self.sink.as_ref());
        }
        while self.correction.is_busy() {
            match self.reports.recv_timeout(self.tick_interval) {
                Ok(report) => self.apply_report(report),
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(e) = self.correction.check_deadline() {
                        self.on_timeout(e);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.drain_reports();
        self.correction.shutdown();
        self.summary()
    }

    /// Statistics so far.
    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            readings_accepted: self.correction.readings_accepted(),
            readings_dropped: self.correction.readings_dropped(),
            out_of_order_queries: self.commands.out_of_order_queries()
                + self.positions.out_of_order_queries(),
            final_status: self.machine.status(),
            sim_time_secs: self.clock.now().as_secs_f64(),
            ..self.summary.clone()
        }
    }

    /// Apply queued commands. Returns true if shutdown was requested.
    fn drain_inbox(&mut self) -> bool {
        while let Ok(command) = self.inbox.try_recv() {
            match command {
                ReplayCommand::Operator(input) => {
                    self.machine
                        .handle(input.event(), &mut self.clock, self.sink.as_ref());
                }
                ReplayCommand::UpdateParams(params) => self.apply_params(&params),
                ReplayCommand::Reading(reading) => self.on_reading(reading),
                ReplayCommand::Shutdown => return true,
            }
        }
        false
    }

    fn drain_reports(&mut self) {
        while let Ok(report) = self.reports.try_recv() {
            self.apply_report(report);
        }
        if let Some(e) = self.correction.check_deadline() {
            self.on_timeout(e);
        }
    }

    fn on_timeout(&mut self, error: AlignmentError) {
        tracing::warn!("There was a problem with the alignment service: {}", error);
        self.apply_report(CorrectionReport::Failed(error));
    }

    fn apply_report(&mut self, report: CorrectionReport) {
        match report {
            CorrectionReport::Error(error) => self.corrector.update_error(error),
            CorrectionReport::Failed(_) => {
                self.summary.alignment_failures += 1;
                self.machine
                    .handle(PlaybackEvent::Fault, &mut self.clock, self.sink.as_ref());
            }
        }
    }

    fn apply_params(&mut self, params: &RuntimeParams) {
        if !(params.lookahead_secs >= 0.0) {
            tracing::warn!(
                "Ignoring invalid lookahead {}s, keeping {:?}",
                params.lookahead_secs,
                self.lookahead()
            );
        } else {
            self.lookahead_us = secs_to_us(params.lookahead_secs);
            tracing::info!("Lookahead set to {:.3}s", params.lookahead_secs);
        }
        self.corrector.update_params(params);
    }

    fn on_reading(&mut self, reading: PointCloud2D) {
        let pose = *self.positions.advance_and_get(self.clock.now_us(), 0);
        self.correction
            .on_reading(reading, self.anchors.current_anchor(), &pose);
    }
}

/// Run `replay` on its own thread.
pub fn spawn_replay_thread<C>(
    replay: ReplayLoop<C>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<ReplaySummary>>
where
    C: TimeSource + Send + 'static,
{
    thread::Builder::new()
        .name("replay".into())
        .spawn(move || replay.run(running))
        .map_err(|e| RepeatError::Thread(format!("Failed to spawn replay thread: {}", e)))
}
