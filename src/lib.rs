//! KhojNav - search controller for a color-seeking wheeled robot
//!
//! The robot searches a rectangular area, modelled as a 3×3 grid of nodes,
//! for a subject marked with a target color. Two strategies are available:
//!
//! - **Perimeter walk**: an edge-scoring planner visits every node and every
//!   boundary edge with as few repeats as possible
//! - **Intellisearch**: an expanding-square pattern for open areas
//!
//! Every motion runs as a cancellable task under a supervisor, so a color
//! detection or an operator kill switch stops the robot mid-motion.

pub mod command;
pub mod config;
pub mod error;
pub mod grid;
pub mod hardware;
pub mod ledger;
pub mod motion;
pub mod planning;
pub mod robot;
pub mod search;
pub mod shared;
pub mod supervisor;
pub mod watcher;

// Re-export commonly used types
pub use command::{Command, ReportEvent, ReportName};
pub use config::KhojConfig;
pub use error::{KhojError, Result};
pub use hardware::{RobotHardware, SimulatedRobot};
pub use robot::Robot;
