//! Per-run search bookkeeping and run classification.

use crate::grid::{EdgeId, Heading, NODE_COUNT, NodeId, PERIMETER_EDGE_COUNT, Topology};
use crate::planning::HopPlan;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// What a search run is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ControllerState {
    Idle = 0,
    PerimeterWalking = 1,
    IntelliSearching = 2,
}

impl ControllerState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ControllerState::PerimeterWalking,
            2 => ControllerState::IntelliSearching,
            _ => ControllerState::Idle,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => f.write_str("idle"),
            ControllerState::PerimeterWalking => f.write_str("walking the perimeter"),
            ControllerState::IntelliSearching => f.write_str("searching"),
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The watcher detected the subject
    SubjectFound,
    /// The traversal goal was met (or the hop limit reached) without a detection
    Exhausted,
    /// The run was stopped from outside
    Cancelled,
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::SubjectFound => f.write_str("subject found"),
            SearchOutcome::Exhausted => f.write_str("exhausted"),
            SearchOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Traversal state owned by one perimeter walk.
#[derive(Clone, Debug)]
pub struct SearchState {
    pub current_node: NodeId,
    pub current_heading: Heading,
    pub visited_nodes: HashSet<NodeId>,
    pub visited_edges: HashSet<EdgeId>,
    pub perimeter_edges_visited: HashSet<EdgeId>,
    pub repeated_nodes: usize,
    pub repeated_edges: usize,
    /// Edges taken, in order
    pub hops: Vec<EdgeId>,
}

impl SearchState {
    /// Fresh state with the start node already visited.
    pub fn new(start: NodeId, heading: Heading) -> Self {
        Self {
            current_node: start,
            current_heading: heading,
            visited_nodes: HashSet::from([start]),
            visited_edges: HashSet::new(),
            perimeter_edges_visited: HashSet::new(),
            repeated_nodes: 0,
            repeated_edges: 0,
            hops: Vec::new(),
        }
    }

    /// Every node visited and every perimeter edge traversed.
    pub fn is_complete(&self) -> bool {
        self.visited_nodes.len() >= NODE_COUNT
            && self.perimeter_edges_visited.len() >= PERIMETER_EDGE_COUNT
    }

    /// Apply a finished hop.
    pub fn record_hop(&mut self, plan: &HopPlan, topology: &Topology) {
        if !self.visited_nodes.insert(plan.destination) {
            self.repeated_nodes += 1;
        }
        if self.visited_edges.insert(plan.edge) {
            if topology.is_perimeter_edge(plan.edge) {
                self.perimeter_edges_visited.insert(plan.edge);
            }
        } else {
            self.repeated_edges += 1;
        }
        self.current_node = plan.destination;
        self.current_heading = plan.heading;
        self.hops.push(plan.edge);
    }

    /// Edge labels joined by spaces, e.g. `"a b e"`.
    pub fn route(&self) -> String {
        self.hops
            .iter()
            .map(|e| e.label().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchSummary {
    pub outcome: SearchOutcome,
    pub hops: usize,
    pub route: String,
    pub repeated_nodes: usize,
    pub repeated_edges: usize,
    pub final_node: Option<NodeId>,
    pub final_heading: Option<Heading>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::turn_angle;

    fn hop(topology: &Topology, from: NodeId, label: char) -> HopPlan {
        let edge = EdgeId::new(label).unwrap();
        let heading = topology.heading_of(edge, from);
        HopPlan {
            edge,
            destination: topology.other_endpoint(edge, from),
            heading,
            turn_angle: turn_angle(Heading::North, heading),
            score: 0,
        }
    }

    #[test]
    fn test_record_hop_counts_repeats() {
        let topo = Topology::standard();
        let mut state = SearchState::new(NodeId::new(0).unwrap(), Heading::North);

        let a = hop(&topo, state.current_node, 'a');
        state.record_hop(&a, &topo);
        assert_eq!(state.current_node.value(), 1);
        assert_eq!(state.current_heading, Heading::East);
        assert_eq!(state.perimeter_edges_visited.len(), 1);

        // Back along the same edge
        let back = hop(&topo, state.current_node, 'a');
        state.record_hop(&back, &topo);
        assert_eq!(state.current_node.value(), 0);
        assert_eq!(state.current_heading, Heading::West);
        assert_eq!(state.repeated_nodes, 1);
        assert_eq!(state.repeated_edges, 1);
        assert_eq!(state.perimeter_edges_visited.len(), 1);
        assert_eq!(state.route(), "a a");
    }

    #[test]
    fn test_interior_edges_are_not_perimeter() {
        let topo = Topology::standard();
        let mut state = SearchState::new(NodeId::CENTER, Heading::North);
        let d = hop(&topo, NodeId::CENTER, 'd');
        state.record_hop(&d, &topo);

        assert_eq!(state.visited_edges.len(), 1);
        assert!(state.perimeter_edges_visited.is_empty());
        assert!(!state.is_complete());
    }

    #[test]
    fn test_controller_state_round_trip() {
        for state in [
            ControllerState::Idle,
            ControllerState::PerimeterWalking,
            ControllerState::IntelliSearching,
        ] {
            assert_eq!(ControllerState::from_u8(state as u8), state);
        }
    }
}
