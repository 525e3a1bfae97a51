//! Next-hop planning for perimeter walks.
//!
//! This module provides:
//! - Edge scoring with a configurable turn penalty
//! - Deterministic selection of the next hop

mod scorer;

pub use scorer::{HopPlan, NavigationPlanner, ScoredEdge, TurnPenalty};
