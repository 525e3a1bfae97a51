//! Closed-loop point turns driven by the gyro.
//!
//! A turn spins the wheels in opposite directions until the gyro has moved
//! by the requested angle, less a fixed lag compensation on larger turns.
//! If the measured result misses by at least the wiggle room, one corrective
//! turn of the residual follows: against the turn on overshoot, along it on
//! undershoot. There is no further iteration.

use crate::config::TurnConfig;
use crate::error::{KhojError, Result};
use crate::grid::TurnDirection;
use crate::hardware::{DriveTrain, HeadingSensor};
use crate::supervisor::CancelToken;
use std::thread;
use std::time::{Duration, Instant};

/// Gyro polling period while a turn is in progress
pub const ANGLE_POLL: Duration = Duration::from_millis(10);

/// Tuning for one closed-loop turn.
#[derive(Clone, Debug)]
pub struct TurnParams {
    pub speed: i32,
    pub correction_factor: f32,
    pub wiggle_room: f32,
    /// Limit for each individual angle wait
    pub timeout: Duration,
}

impl TurnParams {
    pub fn new(turn: &TurnConfig, speed: i32) -> Self {
        Self {
            speed,
            correction_factor: turn.correction_factor,
            wiggle_room: turn.wiggle_room,
            timeout: Duration::try_from_secs_f32(turn.timeout_secs).unwrap_or(Duration::ZERO),
        }
    }

    /// Gyro change at which the wheels are stopped for a turn of `degrees`.
    pub fn stop_threshold(&self, degrees: f32) -> f32 {
        if degrees > 2.0 * self.correction_factor {
            degrees - self.correction_factor
        } else {
            degrees
        }
    }
}

/// What a finished turn measured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurnResult {
    /// Absolute gyro change of the main turn
    pub measured: f32,
    /// Signed residual corrected afterwards (positive: continued, negative: backed off)
    pub correction: Option<f32>,
}

/// Turn by `degrees` (positive right, negative left).
///
/// Returns `Ok(None)` when cancelled. The wheels are stopped on every exit path.
pub fn closed_loop_turn(
    drivetrain: &dyn DriveTrain,
    gyro: &dyn HeadingSensor,
    degrees: f32,
    params: &TurnParams,
    token: &CancelToken,
) -> Result<Option<TurnResult>> {
    let target = degrees.abs();
    if target == 0.0 {
        return Ok(Some(TurnResult {
            measured: 0.0,
            correction: None,
        }));
    }
    let direction = TurnDirection::of_degrees(degrees);

    gyro.reset()?;
    let start = gyro.angle()?;
    let threshold = params.stop_threshold(target);

    if !rotate_until(drivetrain, gyro, start, direction, threshold, params, token)? {
        return Ok(None);
    }

    let measured = (gyro.angle()? - start).abs();
    let error = measured - target;
    tracing::debug!(
        "Turned {:.1} of {:.1} degrees {} (error {:+.1})",
        measured,
        target,
        direction,
        error
    );

    if error.abs() < params.wiggle_room {
        return Ok(Some(TurnResult {
            measured,
            correction: None,
        }));
    }

    let correction_direction = if error > 0.0 {
        direction.opposite()
    } else {
        direction
    };
    tracing::debug!(
        "Correcting {:.1} degrees {}",
        error.abs(),
        correction_direction
    );

    let start = gyro.angle()?;
    if !rotate_until(
        drivetrain,
        gyro,
        start,
        correction_direction,
        error.abs(),
        params,
        token,
    )? {
        return Ok(None);
    }

    Ok(Some(TurnResult {
        measured,
        correction: Some(-error),
    }))
}

/// Spin in `direction` until the gyro moved `degrees` from `start`, then stop.
///
/// Returns `Ok(false)` if cancelled first.
fn rotate_until(
    drivetrain: &dyn DriveTrain,
    gyro: &dyn HeadingSensor,
    start: f32,
    direction: TurnDirection,
    degrees: f32,
    params: &TurnParams,
    token: &CancelToken,
) -> Result<bool> {
    let wheel = direction.sign() as i32 * params.speed;
    drivetrain.set_wheel_speeds(wheel, -wheel)?;

    let outcome = wait_for_angle(gyro, start, degrees, params.timeout, token);
    drivetrain.stop()?;
    outcome
}

fn wait_for_angle(
    gyro: &dyn HeadingSensor,
    start: f32,
    degrees: f32,
    timeout: Duration,
    token: &CancelToken,
) -> Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if token.is_cancelled() {
            return Ok(false);
        }
        if (gyro.angle()? - start).abs() >= degrees {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Err(KhojError::Driver(format!(
                "Gyro did not reach {:.1} degrees within {:?}",
                degrees, timeout
            )));
        }
        thread::sleep(ANGLE_POLL);
    }
}
