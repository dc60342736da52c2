//! Correction loop: sensor reading → alignment → control error.
//!
//! Readings are admitted through a non-blocking in-flight gate. At most one
//! alignment call runs at any time; readings that arrive while a call is in
//! flight are dropped, never queued, so a slow alignment service cannot
//! build up latency. Accepted readings are handed to a small worker pool so
//! the caller never waits on the service.
//!
//! Results travel back to the replay loop as [`CorrectionReport`]s over a
//! bounded channel. The gate is released only after the report has been
//! posted, on every exit path including a panicking service.
//!
//! With an alignment timeout configured, the replay loop polls
//! [`CorrectionLoop::check_deadline`] every tick. A call that outlives the
//! limit is reported as failed right away; it still holds the gate until the
//! service returns, and whatever it returns is then discarded.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::config::CorrectionConfig;
use crate::core::types::{PointCloud2D, Pose2D};
use crate::correction::report::{ControlError, CorrectionReport};
use crate::correction::service::{AlignmentRequest, AlignmentService};
use crate::error::{AlignmentError, RepeatError, Result};
use crate::io::sink::ReplaySink;
use crate::playback::AnchorPoint;

/// Whether a reading was taken for alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Handed to a worker.
    Accepted,
    /// An alignment call is already in flight; reading discarded.
    Dropped,
}

/// Holding this means an alignment call is in flight.
struct InFlightPermit(Arc<AtomicBool>);

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Admission time of the call currently holding the gate.
struct InFlightCall {
    admitted: Instant,
    /// Set by whichever side reports the call first: the worker with its
    /// result, or the deadline check.
    settled: Arc<AtomicBool>,
}

/// Work item for a correction worker.
struct AlignmentJob {
    reading: PointCloud2D,
    reading_to_anchor: Pose2D,
    anchor: Arc<AnchorPoint>,
    settled: Arc<AtomicBool>,
    permit: InFlightPermit,
}

/// Per-worker context.
struct Worker {
    service: Arc<dyn AlignmentService>,
    sink: Arc<dyn ReplaySink>,
    report_tx: Sender<CorrectionReport>,
    timeout: Option<Duration>,
}

/// At-most-one-in-flight correction loop.
pub struct CorrectionLoop {
    sensor_to_robot: Pose2D,
    in_flight: Arc<AtomicBool>,
    current: Mutex<Option<InFlightCall>>,
    timeout: Option<Duration>,
    job_tx: Option<Sender<AlignmentJob>>,
    workers: Vec<JoinHandle<()>>,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl CorrectionLoop {
    /// Start the worker pool.
    ///
    /// Returns the loop and the receiving end of its report channel, which
    /// belongs to the replay loop.
    pub fn spawn(
        config: &CorrectionConfig,
        sensor_to_robot: Pose2D,
        service: Arc<dyn AlignmentService>,
        sink: Arc<dyn ReplaySink>,
    ) -> Result<(Self, Receiver<CorrectionReport>)> {
        let worker_count = config.workers.max(1);
        let (job_tx, job_rx) = crossbeam_channel::bounded::<AlignmentJob>(worker_count);
        let (report_tx, report_rx) =
            crossbeam_channel::bounded::<CorrectionReport>(config.report_capacity.max(1));
        let timeout = config.alignment_timeout_ms.map(Duration::from_millis);

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker = Worker {
                service: Arc::clone(&service),
                sink: Arc::clone(&sink),
                report_tx: report_tx.clone(),
                timeout,
            };
            let jobs = job_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("correction-{}", index))
                .spawn(move || worker.run(jobs))
                .map_err(|e| {
                    RepeatError::Thread(format!("Failed to spawn correction worker: {}", e))
                })?;
            workers.push(handle);
        }

        tracing::info!(
            "Correction loop started with {} worker(s), alignment timeout {:?}",
            worker_count,
            timeout
        );

        Ok((
            Self {
                sensor_to_robot,
                in_flight: Arc::new(AtomicBool::new(false)),
                current: Mutex::new(None),
                timeout,
                job_tx: Some(job_tx),
                workers,
                accepted: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            },
            report_rx,
        ))
    }

    /// Offer a sensor reading for alignment against `anchor`.
    ///
    /// `current_pose` is the pose the robot should have right now; the
    /// reading is moved from the sensor frame, through the robot frame,
    /// into the anchor frame before it is sent to the service. Never blocks.
    pub fn on_reading(
        &self,
        reading: PointCloud2D,
        anchor: &Arc<AnchorPoint>,
        current_pose: &Pose2D,
    ) -> Admission {
        let reading_to_anchor =
            Pose2D::between(current_pose, anchor.pose()).compose(&self.sensor_to_robot);

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::info!("Alignment service was busy, dropped a reading.");
            return Admission::Dropped;
        }
        let permit = InFlightPermit(Arc::clone(&self.in_flight));

        let Some(job_tx) = self.job_tx.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Admission::Dropped;
        };

        let settled = Arc::new(AtomicBool::new(false));
        *self.current.lock() = Some(InFlightCall {
            admitted: Instant::now(),
            settled: Arc::clone(&settled),
        });

        let job = AlignmentJob {
            reading,
            reading_to_anchor,
            anchor: Arc::clone(anchor),
            settled,
            permit,
        };

        match job_tx.try_send(job) {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                Admission::Accepted
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Correction workers unavailable, dropped a reading.");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Admission::Dropped
            }
        }
    }

    /// Report the in-flight call as timed out once it passes the limit.
    ///
    /// Returns the failure at most once per call. The call keeps the gate
    /// until the service returns; its result is then dropped.
    pub fn check_deadline(&self) -> Option<AlignmentError> {
        let limit = self.timeout?;
        if !self.is_busy() {
            return None;
        }

        let current = self.current.lock();
        let call = current.as_ref()?;
        let elapsed = call.admitted.elapsed();
        if elapsed <= limit || call.settled.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(AlignmentError::TimedOut { elapsed, limit })
    }

    /// Whether an alignment call is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Readings handed to a worker so far.
    pub fn readings_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Readings discarded so far.
    pub fn readings_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting readings and wait for the workers to finish.
    ///
    /// An in-flight alignment call runs to completion first.
    pub fn shutdown(&mut self) {
        if self.job_tx.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                tracing::error!("Correction worker panicked: {:?}", e);
            }
        }
        tracing::debug!("Correction loop stopped");
    }
}

impl Drop for CorrectionLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Worker {
    fn run(self, jobs: Receiver<AlignmentJob>) {
        while let Ok(job) = jobs.recv() {
            let AlignmentJob {
                reading,
                reading_to_anchor,
                anchor,
                settled,
                permit,
            } = job;

            let result = self.align(&reading, &reading_to_anchor, &anchor);
            if settled.swap(true, Ordering::AcqRel) {
                tracing::debug!(
                    "Discarding alignment result for {} that came back after its deadline",
                    anchor.name()
                );
                drop(permit);
                continue;
            }

            let report = match result {
                Ok(error) => {
                    self.sink.publish_control_error(error);
                    CorrectionReport::Error(error)
                }
                Err(e) => {
                    tracing::warn!("There was a problem with the alignment service: {}", e);
                    CorrectionReport::Failed(e)
                }
            };

            // Blocks while the channel is full; fails only once the replay
            // loop has dropped its receiver.
            if self.report_tx.send(report).is_err() {
                tracing::warn!("Replay loop gone, correction report lost");
            }

            drop(permit);
        }
    }

    fn align(
        &self,
        reading: &PointCloud2D,
        reading_to_anchor: &Pose2D,
        anchor: &AnchorPoint,
    ) -> std::result::Result<ControlError, AlignmentError> {
        let transformed = reading.transform(reading_to_anchor);
        let request = AlignmentRequest {
            anchor: anchor.name(),
            reading: &transformed,
            reference: anchor.cloud(),
        };

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.service.align(&request)));
        let elapsed = started.elapsed();

        let transform = match outcome {
            Ok(result) => result?,
            Err(payload) => return Err(AlignmentError::Panicked(panic_message(payload))),
        };

        if let Some(limit) = self.timeout
            && elapsed > limit
        {
            return Err(AlignmentError::TimedOut { elapsed, limit });
        }

        Ok(ControlError::from_alignment(&transform))
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
