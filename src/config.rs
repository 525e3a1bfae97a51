//! Configuration loading for KhojNav

use crate::error::{KhojError, Result};
use crate::grid::{NodeId, TurnDirection};
use crate::hardware::ColorCode;
use crate::planning::TurnPenalty;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct KhojConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Search area geometry
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GridConfig {
    /// East/west extent of the search area in feet (default: 10)
    #[serde(default = "default_grid_feet")]
    pub width_ft: f32,

    /// North/south extent of the search area in feet (default: 10)
    #[serde(default = "default_grid_feet")]
    pub height_ft: f32,

    /// Node the robot starts on (default: 4, the center)
    #[serde(default = "default_starting_position")]
    pub starting_position: u8,
}

/// Robot physical parameters
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RobotConfig {
    /// Wheel calibration: inches traveled per wheel rotation (default: 3.75)
    #[serde(default = "default_inches_per_rotation")]
    pub inches_per_rotation: f32,

    /// Forward drive speed in percent of motor power (default: 70)
    #[serde(default = "default_drive_speed")]
    pub drive_speed: i32,

    /// Wheel speed used for point turns in percent (default: 50)
    #[serde(default = "default_turn_speed")]
    pub turn_speed: i32,

    /// Color code of the search subject (default: 3, green)
    #[serde(default = "default_target_color")]
    pub target_color: ColorCode,

    /// Rotations driven by a `move` command without an explicit count (default: 10)
    #[serde(default = "default_move_rotations")]
    pub default_move_rotations: f32,
}

/// Duration estimation and cooperative blocking
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MotionConfig {
    /// Seconds for motors to come up to speed (default: 0.05)
    #[serde(default = "default_rampup_secs")]
    pub rampup_secs: f32,

    /// Seconds per wheel rotation at drive speed (default: 0.5)
    #[serde(default = "default_seconds_per_rotation")]
    pub seconds_per_rotation: f32,

    /// Longest single sleep inside a cooperative wait, in ms (default: 1000, max: 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Multiplier applied to an estimate to get the wait's upper bound (default: 1.5)
    #[serde(default = "default_estimate_margin")]
    pub estimate_margin: f32,

    /// Driver polling period inside motion tasks, in ms (default: 10)
    #[serde(default = "default_sensor_poll_ms")]
    pub sensor_poll_ms: u64,
}

/// Point turn behavior
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TurnConfig {
    /// Degrees turned by a `turn` command without an explicit angle (default: 90)
    #[serde(default = "default_turn_angle")]
    pub default_angle: f32,

    /// Direction used by the expanding-square search and bare `turn` commands
    #[serde(default)]
    pub default_direction: TurnDirection,

    /// Degrees the gyro lags behind on large turns (default: 5)
    #[serde(default = "default_correction_factor")]
    pub correction_factor: f32,

    /// Turn error tolerated before a corrective turn is issued (default: 4)
    #[serde(default = "default_wiggle_room")]
    pub wiggle_room: f32,

    /// Expected duration of a quarter turn in seconds (default: 1.0)
    #[serde(default = "default_settle_secs")]
    pub settle_secs: f32,

    /// Hard limit on a single angle wait in seconds (default: 10)
    #[serde(default = "default_turn_timeout_secs")]
    pub timeout_secs: f32,
}

/// Search strategy parameters
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Color sensor polling period in ms (default: 50)
    #[serde(default = "default_watcher_poll_ms")]
    pub watcher_poll_ms: u64,

    /// Hop limit for a single perimeter walk (default: 64)
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Penalty applied to candidate edges that need a turn
    #[serde(default)]
    pub turn_penalty: TurnPenalty,
}

/// Kill switch behavior
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SupervisorConfig {
    /// Time to wait for each cancelled task before detaching it, in ms (default: 2000)
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

/// Simulated robot used when no hardware is attached
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Seconds the simulated wheels need per rotation (default: 0.5)
    #[serde(default = "default_seconds_per_rotation")]
    pub seconds_per_rotation: f32,

    /// Simulated point-turn rate in degrees per second (default: 180)
    #[serde(default = "default_turn_rate")]
    pub turn_rate_deg_per_sec: f32,

    /// Extra degrees the simulated robot drifts after a turn stops (default: 0)
    #[serde(default)]
    pub turn_overshoot_deg: f32,

    /// Total driven rotations after which the subject comes into view
    #[serde(default)]
    pub subject_after_rotations: Option<f32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width_ft: default_grid_feet(),
            height_ft: default_grid_feet(),
            starting_position: default_starting_position(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            inches_per_rotation: default_inches_per_rotation(),
            drive_speed: default_drive_speed(),
            turn_speed: default_turn_speed(),
            target_color: default_target_color(),
            default_move_rotations: default_move_rotations(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            rampup_secs: default_rampup_secs(),
            seconds_per_rotation: default_seconds_per_rotation(),
            poll_interval_ms: default_poll_interval_ms(),
            estimate_margin: default_estimate_margin(),
            sensor_poll_ms: default_sensor_poll_ms(),
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            default_angle: default_turn_angle(),
            default_direction: TurnDirection::default(),
            correction_factor: default_correction_factor(),
            wiggle_room: default_wiggle_room(),
            settle_secs: default_settle_secs(),
            timeout_secs: default_turn_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            watcher_poll_ms: default_watcher_poll_ms(),
            max_hops: default_max_hops(),
            turn_penalty: TurnPenalty::default(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seconds_per_rotation: default_seconds_per_rotation(),
            turn_rate_deg_per_sec: default_turn_rate(),
            turn_overshoot_deg: 0.0,
            subject_after_rotations: None,
        }
    }
}

// Default value functions
fn default_grid_feet() -> f32 {
    10.0
}
fn default_starting_position() -> u8 {
    4
}
fn default_inches_per_rotation() -> f32 {
    3.75
}
fn default_drive_speed() -> i32 {
    70
}
fn default_turn_speed() -> i32 {
    50
}
fn default_target_color() -> ColorCode {
    ColorCode::Green
}
fn default_move_rotations() -> f32 {
    10.0
}

// Motion defaults
fn default_rampup_secs() -> f32 {
    0.05
}
fn default_seconds_per_rotation() -> f32 {
    0.5
} // roughly 0.5s per rotation at 70% power
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_estimate_margin() -> f32 {
    1.5
}
fn default_sensor_poll_ms() -> u64 {
    10
}

// Turn defaults
fn default_turn_angle() -> f32 {
    90.0
}
fn default_correction_factor() -> f32 {
    5.0
} // gyro falls off by about 5 degrees on larger angles
fn default_wiggle_room() -> f32 {
    4.0
}
fn default_settle_secs() -> f32 {
    1.0
}
fn default_turn_timeout_secs() -> f32 {
    10.0
}

// Search defaults
fn default_watcher_poll_ms() -> u64 {
    50
}
fn default_max_hops() -> usize {
    64
}
fn default_join_timeout_ms() -> u64 {
    2000
}
fn default_turn_rate() -> f32 {
    180.0
}

impl KhojConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KhojError::Config(format!("Failed to read config file: {}", e)))?;
        let config: KhojConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or divide by zero at runtime
    pub fn validate(&self) -> Result<()> {
        if self.grid.width_ft <= 0.0 || self.grid.height_ft <= 0.0 {
            return Err(KhojError::Config(format!(
                "Grid dimensions must be positive, got {}x{} ft",
                self.grid.width_ft, self.grid.height_ft
            )));
        }
        if NodeId::new(self.grid.starting_position).is_none() {
            return Err(KhojError::Config(format!(
                "Starting position {} is not a grid node",
                self.grid.starting_position
            )));
        }
        if self.robot.inches_per_rotation <= 0.0 {
            return Err(KhojError::Config(
                "inches_per_rotation must be positive".to_string(),
            ));
        }
        if self.motion.seconds_per_rotation <= 0.0 || self.motion.rampup_secs < 0.0 {
            return Err(KhojError::Config(
                "Motion timing constants must be positive".to_string(),
            ));
        }
        if !(1..=1000).contains(&self.motion.poll_interval_ms) {
            return Err(KhojError::Config(format!(
                "poll_interval_ms must be within 1..=1000, got {}",
                self.motion.poll_interval_ms
            )));
        }
        if self.motion.estimate_margin < 1.0 {
            return Err(KhojError::Config(
                "estimate_margin must be at least 1.0".to_string(),
            ));
        }
        if self.search.watcher_poll_ms == 0 || self.motion.sensor_poll_ms == 0 {
            return Err(KhojError::Config(
                "Polling periods must be non-zero".to_string(),
            ));
        }
        if self.simulation.seconds_per_rotation <= 0.0
            || self.simulation.turn_rate_deg_per_sec <= 0.0
        {
            return Err(KhojError::Config(
                "Simulation rates must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl MotionConfig {
    /// Longest single sleep of a cooperative wait
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.min(1000))
    }

    /// Polling period for driver and sensor state inside motion tasks
    pub fn sensor_poll(&self) -> Duration {
        Duration::from_millis(self.sensor_poll_ms)
    }
}
