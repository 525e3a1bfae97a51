//! One report per command, ledger entries and set_grid behavior

use super::harness::TestHarness;
use khoj_nav::grid::{Heading, NodeId};
use khoj_nav::ReportName;

#[test]
fn test_launch_reports_ready() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"launch"}"#);

    assert_eq!(event.name, ReportName::Launch);
    assert!(event.success);
    assert!(event.report.contains("center"), "{}", event.report);

    let reports = harness.drain_reports();
    assert_eq!(reports, vec![event]);
    assert_eq!(harness.robot.ledger().kinds(), vec!["launch"]);
}

#[test]
fn test_move_drives_and_reports_after_finishing() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"move","direction":"ahead","rotations":4}"#);

    assert_eq!(event.name, ReportName::Move);
    assert!(event.success, "{}", event.report);
    assert_eq!(harness.sim.drive_count(), 1);
    assert!(harness.sim.rotations_driven() >= 3.99);

    let ledger = harness.robot.ledger();
    assert_eq!(ledger.kinds(), vec!["move"]);
    let json = ledger.to_json().unwrap();
    assert!(json.contains("\"rotations\": 4.0"), "{}", json);
    assert!(!json.contains("\"end_time\": null"), "{}", json);
}

#[test]
fn test_move_with_unknown_direction_fails() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"move","direction":"sideways"}"#);

    assert_eq!(event.name, ReportName::Move);
    assert!(!event.success);
    assert_eq!(harness.sim.drive_count(), 0);
    assert!(harness.robot.ledger().is_empty());
}

#[test]
fn test_turn_uses_defaults() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"turn"}"#);

    assert_eq!(event.name, ReportName::Turn);
    assert!(event.success, "{}", event.report);
    assert!(event.report.contains("90"), "{}", event.report);
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));
    assert_eq!(harness.robot.ledger().kinds(), vec!["turn"]);
}

#[test]
fn test_driver_fault_fails_the_move() {
    let harness = TestHarness::fast();
    harness.sim.set_fault(Some("motor port disconnected"));

    let event = harness.send(r#"{"intent":"move","rotations":2}"#);
    assert!(!event.success);
    assert!(event.report.contains("motor port disconnected"), "{}", event.report);

    // The ledger entry is still closed
    let json = harness.robot.ledger().to_json().unwrap();
    assert!(!json.contains("\"end_time\": null"), "{}", json);
}

#[test]
fn test_set_grid_updates_geometry() {
    let harness = TestHarness::fast();
    let event =
        harness.send(r#"{"intent":"set_grid","width":12,"height":8,"cardinal":"top right"}"#);

    assert_eq!(event.name, ReportName::SetGrid);
    assert!(event.success);

    let geometry = harness.robot.geometry();
    assert_eq!(geometry.width_ft, 12.0);
    assert_eq!(geometry.height_ft, 8.0);
    assert_eq!(geometry.start_node(), NodeId::new(2).unwrap());
    assert_eq!(geometry.heading, Heading::South);
}

#[test]
fn test_set_grid_number_wins_over_cardinal() {
    let harness = TestHarness::fast();
    harness.send(r#"{"intent":"set_grid","position":5,"cardinal":"northwest"}"#);

    let geometry = harness.robot.geometry();
    assert_eq!(geometry.start_node(), NodeId::new(5).unwrap());
    assert_eq!(geometry.heading, Heading::West);
}

#[test]
fn test_set_grid_rejections_keep_previous_values() {
    let harness = TestHarness::fast();
    let before = harness.robot.geometry();

    let event = harness.send(r#"{"intent":"set_grid","width":-3,"position":12}"#);
    assert!(event.success);
    assert!(event.report.contains("rejected"), "{}", event.report);
    assert!(event.report.contains("out of range"), "{}", event.report);
    assert_eq!(harness.robot.geometry(), before);
}

#[test]
fn test_pause_is_recorded() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"pause"}"#);

    assert_eq!(event.name, ReportName::Pause);
    assert!(event.success);
    assert_eq!(harness.robot.ledger().kinds(), vec!["pause"]);
}

#[test]
fn test_unparseable_input_produces_no_report() {
    let harness = TestHarness::fast();
    assert!(harness.robot.handle_json("not json").is_err());
    assert!(harness.robot.handle_json(r#"{"intent":"dance"}"#).is_err());
    assert!(harness.drain_reports().is_empty());
}

#[test]
fn test_report_wire_names() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"killswitch"}"#);
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["name"], "ResponseAfterKillSwitch");
    assert_eq!(json["success"], true);
}
