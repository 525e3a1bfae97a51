//! Search strategies and the run state machine.
//!
//! This module provides:
//! - Exhaustive perimeter walk driven by the navigation planner
//! - Expanding-square ("intellisearch") pattern
//! - Per-run traversal state and outcome classification
//! - The controller that launches one run at a time

mod controller;
mod intellisearch;
mod perimeter;
mod state;

pub use controller::{MotionEnd, SearchContext, SearchController, SearchMode};
pub use intellisearch::{ExpandingSquare, leg_wait_units};
pub use perimeter::plan_route;
pub use state::{ControllerState, SearchOutcome, SearchState, SearchSummary};
