//! Search area model.
//!
//! This module provides:
//! - The fixed 3×3 node/edge topology
//! - Cardinal headings, complements and turn angles
//! - Runtime grid geometry (dimensions, calibration, starting pose)

mod geometry;
mod heading;
mod topology;

pub use geometry::{GridGeometry, infer_heading};
pub use heading::{Heading, TurnDirection, turn_angle};
pub use topology::{
    EDGE_COUNT, EdgeId, GridEdge, GridNode, NODE_COUNT, NodeId, PERIMETER_EDGE_COUNT, Topology,
    quadrant_label,
};
