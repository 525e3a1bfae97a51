//! Motion issuance and cooperative waiting.
//!
//! Drives and turns run as supervised tasks so the kill switch can cancel
//! them mid-motion. Callers get a [`MotionTicket`] and either wait on it or
//! let it run in the background.

use super::estimate::{estimate_duration, wait_limit};
use super::turn::{TurnParams, closed_loop_turn};
use crate::config::{KhojConfig, MotionConfig};
use crate::error::Result;
use crate::hardware::{DriveTrain, HeadingSensor};
use crate::shared::RunFlags;
use crate::supervisor::{CancelToken, Supervisor};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What a ticket was issued for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionKind {
    Drive { rotations: f32, speed: i32 },
    Turn { degrees: f32 },
}

/// Lifecycle of a motion task.
#[derive(Clone, Debug, PartialEq)]
pub enum MotionStatus {
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

impl MotionStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, MotionStatus::Running)
    }
}

/// Handle on an issued motion.
#[derive(Clone, Debug)]
pub struct MotionTicket {
    kind: MotionKind,
    token: CancelToken,
    status: Arc<Mutex<MotionStatus>>,
    issued: Instant,
    estimate: Duration,
    limit: Duration,
}

impl MotionTicket {
    pub fn kind(&self) -> MotionKind {
        self.kind
    }

    pub fn status(&self) -> MotionStatus {
        self.status.lock().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.status.lock().is_finished()
    }

    /// Ask the task to stop; it reports `Cancelled` once the wheels are stopped.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn estimate(&self) -> Duration {
        self.estimate
    }

    /// Latest instant a wait on this ticket lasts until.
    pub fn deadline(&self) -> Instant {
        self.issued + self.limit
    }
}

/// How a cooperative wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The motion finished (inspect the ticket status for failures)
    Completed,
    /// The blocking flag was cleared, usually by the kill switch
    Interrupted,
    /// The safety bound elapsed before the motion reported completion
    TimedOut,
}

/// Issues drives and turns against the hardware.
pub struct MotionExecutor {
    drivetrain: Arc<dyn DriveTrain>,
    gyro: Arc<dyn HeadingSensor>,
    supervisor: Arc<Supervisor>,
    flags: Arc<RunFlags>,
    motion: MotionConfig,
    turn_params: TurnParams,
    turn_timeout: Duration,
}

impl MotionExecutor {
    pub fn new(
        drivetrain: Arc<dyn DriveTrain>,
        gyro: Arc<dyn HeadingSensor>,
        supervisor: Arc<Supervisor>,
        flags: Arc<RunFlags>,
        config: &KhojConfig,
    ) -> Self {
        let turn_params = TurnParams::new(&config.turn, config.robot.turn_speed);
        // Main turn and correction each get the full timeout
        let turn_timeout = turn_params.timeout * 2;
        Self {
            drivetrain,
            gyro,
            supervisor,
            flags,
            motion: config.motion.clone(),
            turn_params,
            turn_timeout,
        }
    }

    /// Expected duration of a motion of `units` rotations.
    pub fn estimate(&self, units: f32) -> Duration {
        estimate_duration(units, &self.motion)
    }

    /// Start a drive of `rotations` at `speed` percent (negative: backward).
    pub fn drive(&self, rotations: f32, speed: i32, brake: bool) -> Result<MotionTicket> {
        let estimate = self.estimate(rotations);
        let limit = wait_limit(estimate, &self.motion);
        let drivetrain = self.drivetrain.clone();
        let poll = self.motion.sensor_poll();

        tracing::info!("Drive {:.2} rotations at {}%", rotations, speed);
        self.spawn_motion(
            "drive",
            MotionKind::Drive { rotations, speed },
            estimate,
            limit,
            move |token| run_drive(drivetrain.as_ref(), rotations, speed, brake, poll, token),
        )
    }

    /// Start a closed-loop turn of `degrees` (positive right, negative left).
    pub fn turn(&self, degrees: f32) -> Result<MotionTicket> {
        let estimate = self.estimate(degrees.abs() / 90.0);
        let drivetrain = self.drivetrain.clone();
        let gyro = self.gyro.clone();
        let params = self.turn_params.clone();

        tracing::info!("Turn {:+.1} degrees", degrees);
        self.spawn_motion(
            "turn",
            MotionKind::Turn { degrees },
            estimate,
            self.turn_timeout,
            move |token| {
                closed_loop_turn(drivetrain.as_ref(), gyro.as_ref(), degrees, &params, token)
                    .map(|result| result.is_some())
            },
        )
    }

    /// Block until the ticket finishes, the blocking flag is cleared, or the
    /// ticket's safety bound elapses.
    ///
    /// A timed-out motion is cancelled so its wheels stop.
    pub fn wait(&self, ticket: &MotionTicket) -> WaitOutcome {
        self.wait_until(ticket, ticket.deadline())
    }

    /// Like [`wait`](Self::wait) with the bound taken from an estimate of
    /// `units` instead of the ticket's own.
    pub fn wait_units(&self, ticket: &MotionTicket, units: f32) -> WaitOutcome {
        let limit = wait_limit(self.estimate(units), &self.motion);
        self.wait_until(ticket, Instant::now() + limit)
    }

    /// Estimate-only wait for `units`, used where no motion is tracked.
    pub fn block_for(&self, units: f32) -> WaitOutcome {
        self.block_duration(self.estimate(units))
    }

    /// Sleep for `duration` in poll-sized increments, exiting early when the
    /// blocking flag is cleared.
    pub fn block_duration(&self, duration: Duration) -> WaitOutcome {
        self.flags.set_blocking(true);
        let end = Instant::now() + duration;
        let outcome = loop {
            if !self.flags.is_blocking() {
                break WaitOutcome::Interrupted;
            }
            let now = Instant::now();
            if now >= end {
                break WaitOutcome::Completed;
            }
            thread::sleep((end - now).min(self.motion.poll_interval()));
        };
        self.flags.set_blocking(false);
        outcome
    }

    fn wait_until(&self, ticket: &MotionTicket, deadline: Instant) -> WaitOutcome {
        self.flags.set_blocking(true);
        // Ticket completion is usually much finer than the poll interval
        let step = self.motion.poll_interval().min(self.motion.sensor_poll());

        let outcome = loop {
            if ticket.is_finished() {
                break WaitOutcome::Completed;
            }
            if !self.flags.is_blocking() {
                break WaitOutcome::Interrupted;
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    "{:?} exceeded its estimate of {:?}, stopping",
                    ticket.kind(),
                    ticket.estimate()
                );
                ticket.cancel();
                self.await_stopped(ticket, step);
                break WaitOutcome::TimedOut;
            }
            thread::sleep((deadline - now).min(step));
        };
        self.flags.set_blocking(false);
        outcome
    }

    /// After cancelling, hold the caller until the task has stopped its
    /// wheels so the next motion cannot be stopped by it.
    fn await_stopped(&self, ticket: &MotionTicket, step: Duration) {
        let deadline = Instant::now() + self.supervisor.join_timeout();
        while !ticket.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "{:?} did not stop within {:?}",
                    ticket.kind(),
                    self.supervisor.join_timeout()
                );
                return;
            }
            thread::sleep(step);
        }
    }

    fn spawn_motion<F>(
        &self,
        name: &'static str,
        kind: MotionKind,
        estimate: Duration,
        limit: Duration,
        body: F,
    ) -> Result<MotionTicket>
    where
        F: FnOnce(&CancelToken) -> Result<bool> + Send + 'static,
    {
        let status = Arc::new(Mutex::new(MotionStatus::Running));
        let task_status = status.clone();
        let issued = Instant::now();

        let token = self.supervisor.spawn(name, move |token| {
            let outcome = match body(&token) {
                Ok(true) => MotionStatus::Completed,
                Ok(false) => MotionStatus::Cancelled,
                Err(e) => {
                    tracing::error!("{} failed: {}", name, e);
                    MotionStatus::Failed(e.to_string())
                }
            };
            tracing::debug!("{} finished: {:?}", name, outcome);
            *task_status.lock() = outcome;
        })?;

        Ok(MotionTicket {
            kind,
            token,
            status,
            issued,
            estimate,
            limit,
        })
    }
}

/// Issue a drive and poll the driver until it stops or the task is cancelled.
fn run_drive(
    drivetrain: &dyn DriveTrain,
    rotations: f32,
    speed: i32,
    brake: bool,
    poll: Duration,
    token: &CancelToken,
) -> Result<bool> {
    drivetrain.drive(rotations, speed, brake)?;

    let outcome = poll_drive(drivetrain, poll, token);
    if let Err(e) = &outcome {
        // The drive was accepted, so the wheels may still be turning
        tracing::warn!("Drive abandoned: {}", e);
        if let Err(stop_err) = drivetrain.stop() {
            tracing::error!("Failed to stop abandoned drive: {}", stop_err);
        }
    }
    outcome
}

fn poll_drive(drivetrain: &dyn DriveTrain, poll: Duration, token: &CancelToken) -> Result<bool> {
    loop {
        if token.is_cancelled() {
            drivetrain.stop()?;
            return Ok(false);
        }
        if !drivetrain.is_running()? {
            return Ok(true);
        }
        thread::sleep(poll);
    }
}
