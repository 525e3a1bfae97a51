//! Motion execution.
//!
//! This module provides:
//! - Drive and turn issuance as cancellable supervised tasks
//! - Closed-loop gyro turns with a single corrective step
//! - Duration estimates and cooperative waits

mod estimate;
mod executor;
mod turn;

pub use estimate::{estimate_duration, wait_limit};
pub use executor::{MotionExecutor, MotionKind, MotionStatus, MotionTicket, WaitOutcome};
pub use turn::{ANGLE_POLL, TurnParams, TurnResult, closed_loop_turn};
