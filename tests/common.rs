//! Test utilities for replay scenarios.
//!
//! Builds replay loops driven by a manual clock, with scripted alignment
//! services and a corrector that records what it was told.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use dhruva_repeat::config::{RepeatConfig, RuntimeParams};
use dhruva_repeat::correction::{AlignmentRequest, AlignmentService, ControlError, CorrectionLoop};
use dhruva_repeat::corrector::MotionCorrector;
use dhruva_repeat::io::MemorySink;
use dhruva_repeat::io::teach::TeachRecording;
use dhruva_repeat::playback::{AnchorPoint, ManualClock};
use dhruva_repeat::threads::{ReplayHandle, ReplayLoop, create_replay_channel};
use dhruva_repeat::{AlignmentError, Point2D, PointCloud2D, Pose2D, Timestamped, Twist2D};

pub const WAIT: Duration = Duration::from_secs(2);

pub type AlignResult = Result<Pose2D, AlignmentError>;

/// Commands from `(t_secs, linear)` pairs.
pub fn commands(samples: &[(f64, f32)]) -> Vec<Timestamped<Twist2D>> {
    samples
        .iter()
        .map(|&(t, v)| Timestamped::from_secs(Twist2D::new(v, 0.0), t))
        .collect()
}

/// Poses moving along +x at `speed` m/s, one per `step` seconds.
pub fn straight_positions(duration: f64, step: f64, speed: f32) -> Vec<Timestamped<Pose2D>> {
    let n = (duration / step).round() as usize;
    (0..=n)
        .map(|i| {
            let t = i as f64 * step;
            Timestamped::from_secs(Pose2D::new(speed * t as f32, 0.0, 0.0), t)
        })
        .collect()
}

/// Anchors on the x axis with a one-point reference cloud each.
pub fn anchors_along_x(anchors: &[(&str, f32)]) -> Vec<AnchorPoint> {
    anchors
        .iter()
        .map(|&(name, x)| {
            AnchorPoint::new(
                name,
                Pose2D::new(x, 0.0, 0.0),
                PointCloud2D::from_points(vec![Point2D::new(1.0, 0.0)]),
            )
        })
        .collect()
}

/// A small reading in the sensor frame.
pub fn reading() -> PointCloud2D {
    PointCloud2D::from_points(vec![Point2D::new(1.0, 0.0), Point2D::new(1.0, 0.5)])
}

/// Alignment service answering from a script.
///
/// Each call pops the next scripted result; an empty script answers with
/// the identity transform. When gated, each call waits for
/// [`ScriptedService::release`] before answering.
pub struct ScriptedService {
    script: Mutex<VecDeque<AlignResult>>,
    calls: Mutex<Vec<String>>,
    gate: Option<(Sender<()>, Receiver<()>)>,
    entered: (Sender<()>, Receiver<()>),
}

impl ScriptedService {
    pub fn new(script: Vec<AlignResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            gate: None,
            entered: crossbeam_channel::unbounded(),
        }
    }

    pub fn gated(script: Vec<AlignResult>) -> Self {
        Self {
            gate: Some(crossbeam_channel::unbounded()),
            ..Self::new(script)
        }
    }

    /// Let one gated call finish.
    pub fn release(&self) {
        if let Some((tx, _)) = &self.gate {
            tx.send(()).unwrap();
        }
    }

    /// Wait until a call has started.
    pub fn wait_entered(&self) {
        self.entered.1.recv_timeout(WAIT).expect("alignment call never started");
    }

    /// Anchors named in calls so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl AlignmentService for ScriptedService {
    fn align(&self, request: &AlignmentRequest<'_>) -> AlignResult {
        self.calls.lock().push(request.anchor.to_string());
        self.entered.0.send(()).ok();
        if let Some((_, rx)) = &self.gate {
            rx.recv_timeout(WAIT)
                .map_err(|_| AlignmentError::Unreachable("gate never released".into()))?;
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Ok(Pose2D::identity()))
    }
}

/// Shared view of what a [`RecordingCorrector`] received.
#[derive(Default)]
pub struct CorrectorLog {
    pub errors: Vec<ControlError>,
    pub params: Vec<RuntimeParams>,
}

/// Corrector that passes commands through and logs its inputs.
pub struct RecordingCorrector(pub Arc<Mutex<CorrectorLog>>);

impl MotionCorrector for RecordingCorrector {
    fn correct_command(&mut self, recorded: Twist2D) -> Twist2D {
        recorded
    }

    fn update_error(&mut self, error: ControlError) {
        self.0.lock().errors.push(error);
    }

    fn update_params(&mut self, params: &RuntimeParams) {
        self.0.lock().params.push(params.clone());
    }
}

/// A replay loop on a manual clock, with handles to everything around it.
pub struct Harness {
    pub wall: ManualClock,
    pub handle: ReplayHandle,
    pub sink: Arc<MemorySink>,
    pub corrector: Arc<Mutex<CorrectorLog>>,
    pub replay: ReplayLoop<ManualClock>,
}

impl Harness {
    pub fn new(
        config: &RepeatConfig,
        recording: TeachRecording,
        service: Arc<dyn AlignmentService>,
    ) -> Self {
        let wall = ManualClock::new();
        let sink = Arc::new(MemorySink::new());
        let corrector = Arc::new(Mutex::new(CorrectorLog::default()));
        let (handle, inbox) = create_replay_channel(config.replay.input_capacity);
        let (correction, reports) = CorrectionLoop::spawn(
            &config.correction,
            config.sensor_mount(),
            service,
            sink.clone(),
        )
        .unwrap();
        let replay = ReplayLoop::new(
            config,
            recording,
            wall.clone(),
            correction,
            reports,
            Box::new(RecordingCorrector(Arc::clone(&corrector))),
            sink.clone(),
            inbox,
        )
        .unwrap();

        Self {
            wall,
            handle,
            sink,
            corrector,
            replay,
        }
    }

    /// Advance wall time, then tick once.
    pub fn step(&mut self, by: Duration) {
        self.wall.advance(by);
        self.replay.tick();
    }

    /// Wait for the in-flight alignment to finish, then tick so its report
    /// is consumed.
    pub fn settle(&mut self) {
        let deadline = Instant::now() + WAIT;
        while self.replay.correction().is_busy() {
            assert!(Instant::now() < deadline, "alignment call never finished");
            thread::sleep(Duration::from_millis(1));
        }
        self.replay.tick();
    }

    /// Commands published so far that were not idle.
    pub fn moving_commands(&self) -> Vec<Twist2D> {
        self.sink
            .commands()
            .into_iter()
            .filter(|c| !c.is_idle())
            .collect()
    }

    /// Number of idle commands published so far.
    pub fn idle_commands(&self) -> usize {
        self.sink.commands().iter().filter(|c| c.is_idle()).count()
    }
}

/// Default recording: 10s at 1 m/s, anchors every 5m.
pub fn default_recording() -> TeachRecording {
    TeachRecording {
        commands: commands(&[(0.0, 1.0), (5.0, 1.0), (10.0, 0.0)]),
        positions: straight_positions(10.0, 0.1, 1.0),
        anchors: anchors_along_x(&[("A", 0.0), ("B", 5.0), ("C", 10.0)]),
    }
}
