//! Interrupting runs: kill switch, stop, expiry, busy rejection and shutdown

use super::harness::{TestHarness, fast_config, slow_config, wait_for};
use khoj_nav::ReportName;
use khoj_nav::search::{ControllerState, SearchOutcome};
use std::thread;
use std::time::Duration;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_kill_switch_stops_intellisearch() {
    let harness = TestHarness::fast();
    assert!(harness.send(r#"{"intent":"start_search"}"#).success);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(harness.robot.search_state(), ControllerState::IntelliSearching);

    let event = harness.send(r#"{"intent":"killswitch"}"#);
    assert_eq!(event.name, ReportName::KillSwitch);
    assert!(event.success, "{}", event.report);

    assert!(harness.wait_idle(STOP_TIMEOUT));
    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::Cancelled);

    assert!(!harness.robot.flags().is_searching());
    assert!(!harness.robot.flags().is_subject_found());
    assert!(harness.sim.stop_count() >= 1);
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));
    assert!(wait_for(STOP_TIMEOUT, || harness.robot.supervisor().active_count() == 0));
    assert!(harness.sim.announcements().is_empty());
}

#[test]
fn test_stop_cancel_interrupts_a_perimeter_hop() {
    let harness = TestHarness::new(slow_config());
    assert!(harness.send(r#"{"intent":"walk_perimeter"}"#).success);
    thread::sleep(Duration::from_millis(300));

    let event = harness.send(r#"{"intent":"stop_cancel"}"#);
    assert_eq!(event.name, ReportName::StopCancel);
    assert!(event.success);

    assert!(harness.wait_idle(STOP_TIMEOUT));
    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::Cancelled);
    // A hop of 16 rotations takes over a second in this configuration
    assert_eq!(summary.hops, 0);
    assert!(harness.sim.rotations_driven() < 16.0);
    assert!(!harness.robot.ledger().kinds().contains(&"move".to_string()));
}

#[test]
fn test_expired_session_stops_the_robot() {
    let harness = TestHarness::new(slow_config());
    harness.send(r#"{"intent":"start_search"}"#);
    thread::sleep(Duration::from_millis(50));

    let event = harness.send(r#"{"intent":"expired"}"#);
    assert_eq!(event.name, ReportName::Expired);
    assert!(event.success);
    assert!(harness.wait_idle(STOP_TIMEOUT));
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));

    let kinds = harness.robot.ledger().kinds();
    assert!(kinds.contains(&"expired".to_string()), "{:?}", kinds);
}

#[test]
fn test_second_search_is_rejected_while_running() {
    let harness = TestHarness::new(slow_config());
    assert!(harness.send(r#"{"intent":"walk_perimeter"}"#).success);

    let event = harness.send(r#"{"intent":"start_search"}"#);
    assert_eq!(event.name, ReportName::StartSearch);
    assert!(!event.success);
    assert!(event.report.contains("busy"), "{}", event.report);

    let event = harness.send(r#"{"intent":"move","rotations":1}"#);
    assert!(!event.success);
    let event = harness.send(r#"{"intent":"turn","direction":"left"}"#);
    assert!(!event.success);

    assert_eq!(
        harness.robot.search_state(),
        ControllerState::PerimeterWalking
    );
    harness.send(r#"{"intent":"killswitch"}"#);
    assert!(harness.wait_idle(STOP_TIMEOUT));

    // Idle again: manual motion is accepted
    assert!(harness.send(r#"{"intent":"move","rotations":0.5}"#).success);
}

#[test]
fn test_every_command_reports_once() {
    let harness = TestHarness::new(slow_config());
    let commands = [
        r#"{"intent":"launch"}"#,
        r#"{"intent":"walk_perimeter"}"#,
        r#"{"intent":"start_search"}"#,
        r#"{"intent":"killswitch"}"#,
        r#"{"intent":"pause"}"#,
    ];
    for command in commands {
        harness.send(command);
    }
    assert!(harness.wait_idle(STOP_TIMEOUT));

    let names: Vec<ReportName> = harness.drain_reports().iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        vec![
            ReportName::Launch,
            ReportName::WalkPerimeter,
            ReportName::StartSearch,
            ReportName::KillSwitch,
            ReportName::Pause,
        ]
    );
}

#[test]
fn test_shutdown_stops_a_running_walk() {
    let harness = TestHarness::new(slow_config());
    harness.send(r#"{"intent":"walk_perimeter"}"#);
    thread::sleep(Duration::from_millis(100));

    let report = harness.robot.shutdown();
    assert_eq!(report.detached, 0);
    assert!(report.stopped >= 1);
    assert!(harness.robot.flags().should_shutdown());
    assert!(harness.wait_idle(STOP_TIMEOUT));
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));
}

#[test]
fn test_kill_switch_when_idle_still_stops_the_drivetrain() {
    let harness = TestHarness::new(fast_config());
    let event = harness.send(r#"{"intent":"killswitch"}"#);

    assert!(event.success);
    assert_eq!(event.report, "Stopped 0 tasks");
    assert_eq!(harness.sim.stop_count(), 1);
}
