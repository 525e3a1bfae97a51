//! Full search runs on the simulated robot

use super::harness::{TestHarness, fast_config, wait_for};
use khoj_nav::ReportName;
use khoj_nav::grid::{Heading, NodeId};
use khoj_nav::search::SearchOutcome;
use khoj_nav::watcher::FOUND_MESSAGE;
use std::time::Duration;

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn test_perimeter_walk_from_center_is_exhausted() {
    let harness = TestHarness::fast();
    let event = harness.send(r#"{"intent":"walk_perimeter"}"#);
    assert_eq!(event.name, ReportName::WalkPerimeter);
    assert!(event.success, "{}", event.report);

    assert!(harness.wait_idle(RUN_TIMEOUT));
    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::Exhausted);
    assert_eq!(summary.route, "d a c h k l j e b");
    assert_eq!(summary.hops, 9);
    assert_eq!(summary.final_node, Some(NodeId::new(1).unwrap()));
    assert_eq!(summary.final_heading, Some(Heading::West));

    // The next walk starts where this one ended
    let geometry = harness.robot.geometry();
    assert_eq!(geometry.start_node(), NodeId::new(1).unwrap());
    assert_eq!(geometry.heading, Heading::West);

    assert!(harness.sim.announcements().is_empty());
    assert_eq!(harness.sim.drive_count(), 9);
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));

    let kinds = harness.robot.ledger().kinds();
    assert_eq!(kinds, vec!["start_walk_perimeter", "walk_perimeter"]);
}

#[test]
fn test_perimeter_walk_stops_on_detection() {
    let mut config = fast_config();
    // One hop across a 10 ft grid is 16 rotations
    config.simulation.subject_after_rotations = Some(20.0);
    let harness = TestHarness::new(config);

    harness.send(r#"{"intent":"set_grid","position":0}"#);
    assert!(harness.send(r#"{"intent":"walk_perimeter"}"#).success);
    assert!(harness.wait_idle(RUN_TIMEOUT));
    assert!(wait_for(RUN_TIMEOUT, || !harness.sim.announcements().is_empty()));

    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::SubjectFound);
    assert!(summary.hops < 2, "route {}", summary.route);
    assert!(harness.robot.flags().is_subject_found());
    assert!(!harness.robot.flags().is_searching());
    assert_eq!(harness.sim.announcements(), vec![FOUND_MESSAGE.to_string()]);
    assert_eq!(harness.sim.wheel_speeds(), (0, 0));
}

#[test]
fn test_hop_limit_ends_the_walk() {
    let mut config = fast_config();
    config.search.max_hops = 2;
    let harness = TestHarness::new(config);

    harness.send(r#"{"intent":"walk_perimeter"}"#);
    assert!(harness.wait_idle(RUN_TIMEOUT));

    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::Exhausted);
    assert_eq!(summary.route, "d a");
}

#[test]
fn test_intellisearch_runs_until_detection() {
    let mut config = fast_config();
    config.simulation.subject_after_rotations = Some(3.0);
    // Long enough legs that detection lands well inside the third one
    config.motion.seconds_per_rotation = 0.03;
    config.simulation.seconds_per_rotation = 0.02;
    let harness = TestHarness::new(config);

    let event = harness.send(r#"{"intent":"start_search"}"#);
    assert_eq!(event.name, ReportName::StartSearch);
    assert!(event.success, "{}", event.report);

    assert!(harness.wait_idle(RUN_TIMEOUT));
    assert!(wait_for(RUN_TIMEOUT, || !harness.sim.announcements().is_empty()));
    let summary = harness.robot.last_summary().unwrap();
    assert_eq!(summary.outcome, SearchOutcome::SubjectFound);
    // Legs of 1 and 1 rotation finish before the subject comes into view
    assert_eq!(summary.hops, 2);
    assert_eq!(harness.sim.announcements(), vec![FOUND_MESSAGE.to_string()]);

    let kinds = harness.robot.ledger().kinds();
    assert_eq!(kinds[0], "start_search");
    assert_eq!(kinds[1], "intellisearch");
    assert_eq!(&kinds[2..], ["move", "turn", "move", "turn", "move"]);
}

#[test]
fn test_search_can_run_again_after_detection() {
    let mut config = fast_config();
    config.simulation.subject_after_rotations = Some(1.5);
    let harness = TestHarness::new(config);

    harness.send(r#"{"intent":"start_search"}"#);
    assert!(harness.wait_idle(RUN_TIMEOUT));
    assert_eq!(
        harness.robot.last_summary().unwrap().outcome,
        SearchOutcome::SubjectFound
    );

    // The subject stays in view, so the second run finds it right away
    assert!(harness.send(r#"{"intent":"start_search"}"#).success);
    assert!(harness.wait_idle(RUN_TIMEOUT));
    assert_eq!(
        harness.robot.last_summary().unwrap().outcome,
        SearchOutcome::SubjectFound
    );
    assert!(wait_for(RUN_TIMEOUT, || harness.sim.announcements().len() == 2));
}
