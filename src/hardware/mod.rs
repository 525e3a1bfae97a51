//! Hardware abstraction for the search robot.
//!
//! The navigation core only talks to these traits. Real motor and sensor
//! bindings implement them outside this crate; [`SimulatedRobot`] implements
//! all of them for the daemon's dry runs and for tests.
//!
//! All methods take `&self` so one device can be shared as `Arc<dyn ...>`
//! between the command handler, motion tasks and the subject watcher.

mod sim;

pub use sim::SimulatedRobot;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Differential drivetrain with rotation-bounded moves.
pub trait DriveTrain: Send + Sync {
    /// Start a drive of `rotations` wheel turns at `speed` percent.
    ///
    /// Returns once the command is accepted; use [`is_running`](Self::is_running)
    /// to observe completion. Negative speeds drive backward.
    fn drive(&self, rotations: f32, speed: i32, brake: bool) -> Result<()>;

    /// Run the wheels continuously at independent speeds.
    fn set_wheel_speeds(&self, left: i32, right: i32) -> Result<()>;

    /// Stop both wheels.
    fn stop(&self) -> Result<()>;

    /// True while a drive started by [`drive`](Self::drive) is still moving.
    fn is_running(&self) -> Result<bool>;
}

/// Gyro reporting a cumulative signed angle in degrees (clockwise positive).
pub trait HeadingSensor: Send + Sync {
    fn reset(&self) -> Result<()>;
    fn angle(&self) -> Result<f32>;
}

pub trait ColorSensor: Send + Sync {
    fn color(&self) -> Result<ColorCode>;
}

/// Audible feedback to the operator.
pub trait Announcer: Send + Sync {
    fn announce(&self, message: &str) -> Result<()>;
}

/// Reflected color classes reported by the color sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ColorCode {
    NoColor = 0,
    Black = 1,
    Blue = 2,
    Green = 3,
    Yellow = 4,
    Red = 5,
    White = 6,
    Brown = 7,
}

impl TryFrom<u8> for ColorCode {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Ok(match code {
            0 => ColorCode::NoColor,
            1 => ColorCode::Black,
            2 => ColorCode::Blue,
            3 => ColorCode::Green,
            4 => ColorCode::Yellow,
            5 => ColorCode::Red,
            6 => ColorCode::White,
            7 => ColorCode::Brown,
            other => return Err(format!("Unknown color code {}", other)),
        })
    }
}

impl From<ColorCode> for u8 {
    fn from(color: ColorCode) -> u8 {
        color as u8
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorCode::NoColor => "none",
            ColorCode::Black => "black",
            ColorCode::Blue => "blue",
            ColorCode::Green => "green",
            ColorCode::Yellow => "yellow",
            ColorCode::Red => "red",
            ColorCode::White => "white",
            ColorCode::Brown => "brown",
        };
        f.write_str(name)
    }
}

/// The set of devices one robot is built from.
#[derive(Clone)]
pub struct RobotHardware {
    pub drivetrain: Arc<dyn DriveTrain>,
    pub gyro: Arc<dyn HeadingSensor>,
    pub color: Arc<dyn ColorSensor>,
    pub announcer: Arc<dyn Announcer>,
}

impl RobotHardware {
    /// Use one simulated robot for every device.
    pub fn simulated(sim: Arc<SimulatedRobot>) -> Self {
        Self {
            drivetrain: sim.clone(),
            gyro: sim.clone(),
            color: sim.clone(),
            announcer: sim,
        }
    }
}
