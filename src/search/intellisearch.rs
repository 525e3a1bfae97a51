//! Expanding-square search for open areas.
//!
//! Drive a leg, turn a quarter in the default direction, repeat; every
//! second leg grows by two rotations so the path spirals outward.

use super::controller::{MotionEnd, SearchContext};
use super::state::{SearchOutcome, SearchSummary};
use crate::error::Result;
use crate::ledger::params;
use crate::motion::WaitOutcome;
use crate::supervisor::CancelToken;
use serde_json::{Map, json};
use std::time::Duration;

/// Leg lengths in rotations: 1, 1, 3, 3, 5, 5, 7, 7, ...
#[derive(Clone, Debug)]
pub struct ExpandingSquare {
    leg: u32,
    iteration: u32,
}

impl ExpandingSquare {
    pub fn new() -> Self {
        Self {
            leg: 1,
            iteration: 0,
        }
    }
}

impl Default for ExpandingSquare {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for ExpandingSquare {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let leg = self.leg;
        if self.iteration % 2 == 1 {
            self.leg += 2;
        }
        self.iteration += 1;
        Some(leg)
    }
}

/// Time units to wait for a leg: short legs get extra time for ramp-up.
pub fn leg_wait_units(leg: u32) -> f32 {
    if leg == 1 { 2.0 } else { leg as f32 }
}

/// Run the expanding-square pattern until the run is stopped.
pub fn run(ctx: &SearchContext, token: &CancelToken) -> Result<SearchSummary> {
    let entry = ctx.ledger.begin("intellisearch", Map::new());
    tracing::info!("Intellisearch started");

    let mut legs = 0usize;
    let result = search_loop(ctx, token, &mut legs);

    let outcome = if ctx.flags.is_subject_found() {
        SearchOutcome::SubjectFound
    } else {
        SearchOutcome::Cancelled
    };
    ctx.ledger.annotate(entry, "legs", json!(legs));
    ctx.ledger.annotate(entry, "outcome", json!(outcome));
    ctx.ledger.finish(entry);

    result?;
    tracing::info!("Intellisearch ended after {} legs: {}", legs, outcome);
    Ok(SearchSummary {
        outcome,
        hops: legs,
        route: String::new(),
        repeated_nodes: 0,
        repeated_edges: 0,
        final_node: None,
        final_heading: None,
    })
}

fn search_loop(ctx: &SearchContext, token: &CancelToken, legs: &mut usize) -> Result<()> {
    let speed = ctx.config.robot.drive_speed;
    let direction = ctx.config.turn.default_direction;
    let degrees = ctx.config.turn.default_angle;
    let settle = Duration::try_from_secs_f32(ctx.config.turn.settle_secs).unwrap_or(Duration::ZERO);

    for leg in ExpandingSquare::new() {
        if !ctx.flags.is_searching() || token.is_cancelled() {
            break;
        }

        let id = ctx.ledger.begin(
            "move",
            params([("speed", json!(speed)), ("rotations", json!(leg))]),
        );
        let ticket = ctx.executor.drive(leg as f32, speed, false)?;
        let driven = ctx.await_motion(&ticket, token, Some(leg_wait_units(leg)));
        ctx.ledger.finish(id);
        if driven? == MotionEnd::Stopped {
            break;
        }

        // Detection can land mid-leg
        if !ctx.flags.is_searching() {
            break;
        }

        let id = ctx.ledger.begin(
            "turn",
            params([
                ("direction", json!(direction)),
                ("degrees", json!(degrees)),
            ]),
        );
        let ticket = ctx.executor.turn(direction.sign() * degrees)?;
        let turned = ctx.await_motion(&ticket, token, None);
        ctx.ledger.finish(id);
        if turned? == MotionEnd::Stopped {
            break;
        }

        if ctx.executor.block_duration(settle) == WaitOutcome::Interrupted {
            break;
        }
        *legs += 1;
    }
    Ok(())
}
