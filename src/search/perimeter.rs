//! Exhaustive perimeter walk over the 3×3 grid.
//!
//! Each hop: plan the next edge, turn onto its heading (awaited), drive half
//! the grid dimension along the travel axis (awaited), then update the
//! traversal state. A drive cut short after a timeout is not recorded and the
//! hop is planned again. The walk ends when every node has been visited and
//! every perimeter edge traversed, on cancellation, or at the hop limit, which
//! counts attempts rather than recorded hops.

use super::controller::{MotionEnd, SearchContext};
use super::state::{SearchOutcome, SearchState, SearchSummary};
use crate::error::Result;
use crate::grid::{Heading, NodeId, quadrant_label};
use crate::ledger::params;
use crate::planning::NavigationPlanner;
use crate::supervisor::CancelToken;
use serde_json::json;

/// Why the hop loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopExit {
    Complete,
    HopLimit,
    Stopped,
}

/// Plan a whole walk without moving, assuming every hop succeeds.
pub fn plan_route(
    planner: &NavigationPlanner,
    start: NodeId,
    heading: Heading,
    max_hops: usize,
) -> SearchState {
    let mut state = SearchState::new(start, heading);
    while !state.is_complete() && state.hops.len() < max_hops {
        let plan = planner.plan(
            state.current_node,
            state.current_heading,
            &state.visited_nodes,
            &state.visited_edges,
        );
        state.record_hop(&plan, planner.topology());
    }
    state
}

/// Walk the perimeter from the geometry's current pose.
pub fn walk(ctx: &SearchContext, token: &CancelToken) -> Result<SearchSummary> {
    let start = ctx.geometry.read().clone();
    let start_node = start.start_node();
    let max_hops = ctx.config.search.max_hops;

    let entry = ctx.ledger.begin(
        "walk_perimeter",
        params([
            ("grid_width", json!(start.width_ft)),
            ("grid_height", json!(start.height_ft)),
            ("position", json!(start_node)),
            ("heading", json!(start.heading)),
        ]),
    );
    tracing::info!(
        "Perimeter walk from {} ({}) heading {}",
        start_node,
        quadrant_label(start_node),
        start.heading
    );
    tracing::debug!(
        "Planned route: {}",
        plan_route(&ctx.planner, start_node, start.heading, max_hops).route()
    );

    let mut state = SearchState::new(start_node, start.heading);
    let result = hop_loop(ctx, token, &mut state, max_hops);

    ctx.geometry
        .write()
        .set_pose(state.current_node, state.current_heading);

    let exit = match result {
        Ok(exit) => exit,
        Err(e) => {
            ctx.ledger.annotate(entry, "error", json!(e.to_string()));
            ctx.ledger.finish(entry);
            return Err(e);
        }
    };

    let outcome = if ctx.flags.is_subject_found() {
        SearchOutcome::SubjectFound
    } else if exit == LoopExit::Complete || exit == LoopExit::HopLimit {
        SearchOutcome::Exhausted
    } else {
        SearchOutcome::Cancelled
    };

    if outcome == SearchOutcome::Exhausted {
        // Subject is not on a perimeter route; release the watcher
        ctx.flags.set_searching(false);
        ctx.flags.set_subject_found(true);
    }

    tracing::info!(
        "Perimeter walk {}: {} hops ({}), {} repeated nodes, {} repeated edges",
        outcome,
        state.hops.len(),
        state.route(),
        state.repeated_nodes,
        state.repeated_edges
    );

    let summary = SearchSummary {
        outcome,
        hops: state.hops.len(),
        route: state.route(),
        repeated_nodes: state.repeated_nodes,
        repeated_edges: state.repeated_edges,
        final_node: Some(state.current_node),
        final_heading: Some(state.current_heading),
    };
    ctx.ledger.annotate(entry, "summary", json!(summary));
    ctx.ledger.finish(entry);
    Ok(summary)
}

fn hop_loop(
    ctx: &SearchContext,
    token: &CancelToken,
    state: &mut SearchState,
    max_hops: usize,
) -> Result<LoopExit> {
    let mut attempts = 0;
    loop {
        if !ctx.flags.is_searching() || token.is_cancelled() {
            return Ok(LoopExit::Stopped);
        }
        if state.is_complete() {
            return Ok(LoopExit::Complete);
        }
        if attempts >= max_hops {
            tracing::warn!(
                "Perimeter walk reached the hop limit of {} ({} hops, {} nodes, {} perimeter edges)",
                max_hops,
                state.hops.len(),
                state.visited_nodes.len(),
                state.perimeter_edges_visited.len()
            );
            return Ok(LoopExit::HopLimit);
        }
        attempts += 1;

        // Geometry may change between hops via set_grid
        let geometry = ctx.geometry.read().clone();
        let plan = ctx.planner.plan(
            state.current_node,
            state.current_heading,
            &state.visited_nodes,
            &state.visited_edges,
        );
        tracing::info!(
            "Hop {}: edge {} to node {} ({}), heading {}",
            state.hops.len() + 1,
            plan.edge,
            plan.destination,
            quadrant_label(plan.destination),
            plan.heading
        );

        if plan.turn_angle != 0 {
            let ticket = ctx.executor.turn(plan.turn_angle as f32)?;
            match ctx.await_motion(&ticket, token, None)? {
                MotionEnd::Completed => state.current_heading = plan.heading,
                MotionEnd::CutShort => continue,
                MotionEnd::Stopped => return Ok(LoopExit::Stopped),
            }
        }

        let rotations = geometry.leg_rotations(plan.heading);
        tracing::debug!(
            "Driving {:.1} inches using {:.2} rotations",
            geometry.leg_inches(plan.heading),
            rotations
        );
        let ticket = ctx
            .executor
            .drive(rotations, ctx.config.robot.drive_speed, false)?;
        match ctx.await_motion(&ticket, token, None)? {
            MotionEnd::Completed => state.record_hop(&plan, ctx.planner.topology()),
            MotionEnd::CutShort => {
                tracing::warn!("Edge {} not reached, planning again", plan.edge);
            }
            MotionEnd::Stopped => return Ok(LoopExit::Stopped),
        }
    }
}
