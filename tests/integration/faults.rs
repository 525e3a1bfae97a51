//! Driver faults and overrunning motions inside search runs

use super::harness::{TestHarness, fast_config, slow_config, wait_for};
use khoj_nav::hardware::DriveTrain;
use khoj_nav::search::{ControllerState, SearchOutcome};
use std::thread;
use std::time::Duration;

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// The run ended without a summary and left the robot stopped and idle.
fn assert_aborted(harness: &TestHarness) {
    assert!(harness.wait_idle(RUN_TIMEOUT));
    assert_eq!(harness.robot.search_state(), ControllerState::Idle);
    assert!(harness.robot.last_summary().is_none());
    assert!(!harness.robot.flags().is_searching());
    assert!(harness.sim.stop_count() >= 1);

    harness.sim.set_fault(None);
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));
    assert!(!harness.sim.is_running().unwrap());

    let driven = harness.sim.rotations_driven();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.sim.rotations_driven(), driven);
}

#[test]
fn test_fault_during_perimeter_walk_aborts_and_stops() {
    let harness = TestHarness::new(slow_config());
    assert!(harness.send(r#"{"intent":"walk_perimeter"}"#).success);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(harness.robot.search_state(), ControllerState::PerimeterWalking);

    harness.sim.set_fault(Some("encoder read failed"));
    assert_aborted(&harness);

    assert!(harness.send(r#"{"intent":"launch"}"#).success);
    let event = harness.send(r#"{"intent":"move","rotations":1}"#);
    assert!(event.success, "{}", event.report);
}

#[test]
fn test_fault_during_intellisearch_aborts_and_stops() {
    let harness = TestHarness::new(slow_config());
    assert!(harness.send(r#"{"intent":"start_search"}"#).success);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(harness.robot.search_state(), ControllerState::IntelliSearching);

    harness.sim.set_fault(Some("encoder read failed"));
    assert_aborted(&harness);

    let event = harness.send(r#"{"intent":"move","rotations":1}"#);
    assert!(event.success, "{}", event.report);
    assert!(harness.send(r#"{"intent":"start_search"}"#).success);
    harness.send(r#"{"intent":"killswitch"}"#);
    assert!(harness.wait_idle(RUN_TIMEOUT));
}

#[test]
fn test_timed_out_hops_are_not_recorded() {
    let mut config = fast_config();
    // Every 16-rotation leg outlasts its wait bound
    config.simulation.seconds_per_rotation = 0.02;
    config.search.max_hops = 3;
    let harness = TestHarness::new(config);

    assert!(harness.send(r#"{"intent":"walk_perimeter"}"#).success);
    assert!(harness.wait_idle(RUN_TIMEOUT));

    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::Exhausted);
    assert_eq!(summary.hops, 0);
    assert_eq!(summary.route, "");
    assert_eq!(summary.final_node, Some(harness.robot.geometry().start_node()));

    assert_eq!(harness.sim.drive_count(), 3);
    assert!(harness.sim.stop_count() >= 3);
    assert!(wait_for(RUN_TIMEOUT, || harness.robot.supervisor().active_count() == 0));
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));
    assert!(!harness.sim.is_running().unwrap());
}
