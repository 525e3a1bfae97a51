//! Motion duration estimates.

use crate::config::MotionConfig;
use std::time::Duration;

/// Expected time for a motion of `units` wheel rotations (or time units).
///
/// `rampup + seconds_per_rotation * units`, never negative.
pub fn estimate_duration(units: f32, motion: &MotionConfig) -> Duration {
    let secs = motion.rampup_secs + motion.seconds_per_rotation * units.abs();
    Duration::try_from_secs_f32(secs.max(0.0)).unwrap_or(Duration::ZERO)
}

/// Upper bound a wait may take before it gives up on a motion.
pub fn wait_limit(estimate: Duration, motion: &MotionConfig) -> Duration {
    estimate.mul_f32(motion.estimate_margin.max(1.0))
}
