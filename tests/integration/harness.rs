//! Test harness: a robot wired to a fast simulation

use crossbeam_channel::Receiver;
use khoj_nav::search::ControllerState;
use khoj_nav::{KhojConfig, ReportEvent, Robot, RobotHardware, SimulatedRobot};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Configuration with motion estimates a little above the simulated timings.
pub fn fast_config() -> KhojConfig {
    let mut config = KhojConfig::default();
    config.motion.rampup_secs = 0.0;
    config.motion.seconds_per_rotation = 0.01;
    config.motion.poll_interval_ms = 10;
    config.motion.sensor_poll_ms = 2;
    config.turn.settle_secs = 0.0;
    config.search.watcher_poll_ms = 5;
    config.simulation.seconds_per_rotation = 0.005;
    config.simulation.turn_rate_deg_per_sec = 900.0;
    config
}

/// Configuration where every hop takes long enough to interrupt.
pub fn slow_config() -> KhojConfig {
    let mut config = fast_config();
    config.motion.seconds_per_rotation = 0.1;
    config.simulation.seconds_per_rotation = 0.08;
    config
}

pub struct TestHarness {
    pub robot: Robot,
    pub sim: Arc<SimulatedRobot>,
    pub reports: Receiver<ReportEvent>,
}

impl TestHarness {
    pub fn new(config: KhojConfig) -> Self {
        let sim = Arc::new(SimulatedRobot::from_config(&config));
        let (tx, reports) = crossbeam_channel::unbounded();
        let robot = Robot::new(config, RobotHardware::simulated(sim.clone()), tx);
        Self {
            robot,
            sim,
            reports,
        }
    }

    pub fn fast() -> Self {
        Self::new(fast_config())
    }

    /// Run one JSON command and return its report.
    pub fn send(&self, json: &str) -> ReportEvent {
        self.robot
            .handle_json(json)
            .unwrap_or_else(|e| panic!("bad command {}: {}", json, e))
    }

    /// Block until the current search run returns to idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        wait_for(timeout, || self.robot.search_state() == ControllerState::Idle)
    }

    /// Reports emitted so far.
    pub fn drain_reports(&self) -> Vec<ReportEvent> {
        self.reports.try_iter().collect()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
