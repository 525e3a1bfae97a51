//! Simulated robot for dry runs and tests
//!
//! State is advanced lazily from wall-clock timestamps whenever a device
//! method is called, so no background thread is needed.

use super::{Announcer, ColorCode, ColorSensor, DriveTrain, HeadingSensor};
use crate::config::{KhojConfig, SimulationConfig};
use crate::error::{KhojError, Result};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Simulated drivetrain, gyro, color sensor and speaker
pub struct SimulatedRobot {
    config: SimulationConfig,
    target: ColorCode,
    state: Mutex<SimState>,
}

#[derive(Debug)]
struct ActiveDrive {
    started: Instant,
    duration: Duration,
    rotations: f32,
}

#[derive(Debug, Default)]
struct SimState {
    drive: Option<ActiveDrive>,
    wheels: (i32, i32),
    /// Set while the wheels spin in opposite directions
    turn_since: Option<Instant>,
    turn_sign: f32,
    angle: f32,
    rotations_driven: f32,
    forced_color: Option<ColorCode>,
    fault: Option<String>,
    announcements: Vec<String>,
    drive_count: usize,
    stop_count: usize,
}

impl SimState {
    fn settle_turn(&mut self, now: Instant, rate: f32) {
        if let Some(since) = self.turn_since {
            self.angle += self.turn_sign * rate * now.duration_since(since).as_secs_f32();
            self.turn_since = Some(now);
        }
    }

    fn settle_drive(&mut self, now: Instant) {
        if let Some(drive) = &self.drive
            && now.duration_since(drive.started) >= drive.duration
        {
            self.rotations_driven += drive.rotations;
            self.drive = None;
        }
    }

    /// Rotations driven so far, including the finished share of an active drive
    fn rotations_at(&self, now: Instant) -> f32 {
        let partial = self.drive.as_ref().map_or(0.0, |drive| {
            let fraction = if drive.duration.is_zero() {
                1.0
            } else {
                (now.duration_since(drive.started).as_secs_f32() / drive.duration.as_secs_f32())
                    .min(1.0)
            };
            drive.rotations * fraction
        });
        self.rotations_driven + partial
    }

    fn check_fault(&self) -> Result<()> {
        match &self.fault {
            Some(message) => Err(KhojError::Driver(message.clone())),
            None => Ok(()),
        }
    }
}

impl SimulatedRobot {
    pub fn new(config: SimulationConfig, target: ColorCode) -> Self {
        Self {
            config,
            target,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Simulated robot matching a full configuration
    pub fn from_config(config: &KhojConfig) -> Self {
        Self::new(config.simulation.clone(), config.robot.target_color)
    }

    /// Force the color sensor reading (`None` restores the simulated reading)
    pub fn set_color(&self, color: Option<ColorCode>) {
        self.state.lock().forced_color = color;
    }

    /// Make every subsequent motor command fail with `message`
    pub fn set_fault(&self, message: Option<&str>) {
        self.state.lock().fault = message.map(str::to_string);
    }

    pub fn announcements(&self) -> Vec<String> {
        self.state.lock().announcements.clone()
    }

    pub fn drive_count(&self) -> usize {
        self.state.lock().drive_count
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stop_count
    }

    pub fn wheel_speeds(&self) -> (i32, i32) {
        self.state.lock().wheels
    }

    /// Total rotations driven, including a drive in progress
    pub fn rotations_driven(&self) -> f32 {
        self.state.lock().rotations_at(Instant::now())
    }
}

impl DriveTrain for SimulatedRobot {
    fn drive(&self, rotations: f32, speed: i32, _brake: bool) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.check_fault()?;
        state.settle_drive(now);
        state.drive_count += 1;

        let rotations = rotations.abs();
        if rotations == 0.0 || speed == 0 {
            return Ok(());
        }
        let duration =
            Duration::try_from_secs_f32(rotations * self.config.seconds_per_rotation)
                .unwrap_or(Duration::ZERO);

        // A new drive replaces the one in progress
        if let Some(previous) = state.drive.take() {
            let fraction = if previous.duration.is_zero() {
                1.0
            } else {
                now.duration_since(previous.started).as_secs_f32()
                    / previous.duration.as_secs_f32()
            };
            state.rotations_driven += previous.rotations * fraction.min(1.0);
        }
        state.drive = Some(ActiveDrive {
            started: now,
            duration,
            rotations,
        });
        tracing::debug!(
            "Sim drive: {:.2} rotations at {}% ({:.2}s)",
            rotations,
            speed,
            duration.as_secs_f32()
        );
        Ok(())
    }

    fn set_wheel_speeds(&self, left: i32, right: i32) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.check_fault()?;
        state.settle_turn(now, self.config.turn_rate_deg_per_sec);

        state.wheels = (left, right);
        state.turn_sign = (left - right).signum() as f32;
        state.turn_since = (left != right).then_some(now);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.stop_count += 1;
        state.settle_turn(now, self.config.turn_rate_deg_per_sec);

        if state.turn_since.take().is_some() {
            state.angle += state.turn_sign * self.config.turn_overshoot_deg;
        }
        state.wheels = (0, 0);

        if state.drive.is_some() {
            state.rotations_driven = state.rotations_at(now);
            state.drive = None;
        }
        Ok(())
    }

    fn is_running(&self) -> Result<bool> {
        let mut state = self.state.lock();
        state.check_fault()?;
        state.settle_drive(Instant::now());
        Ok(state.drive.is_some())
    }
}

impl HeadingSensor for SimulatedRobot {
    fn reset(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.settle_turn(now, self.config.turn_rate_deg_per_sec);
        state.angle = 0.0;
        Ok(())
    }

    fn angle(&self) -> Result<f32> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.settle_turn(now, self.config.turn_rate_deg_per_sec);
        Ok(state.angle)
    }
}

impl ColorSensor for SimulatedRobot {
    fn color(&self) -> Result<ColorCode> {
        let state = self.state.lock();
        if let Some(color) = state.forced_color {
            return Ok(color);
        }
        let seen = self
            .config
            .subject_after_rotations
            .is_some_and(|after| state.rotations_at(Instant::now()) >= after);
        Ok(if seen { self.target } else { ColorCode::NoColor })
    }
}

impl Announcer for SimulatedRobot {
    fn announce(&self, message: &str) -> Result<()> {
        tracing::info!("Announce: {}", message);
        self.state.lock().announcements.push(message.to_string());
        Ok(())
    }
}
