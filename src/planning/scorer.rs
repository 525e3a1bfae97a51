//! Edge scoring for perimeter traversal.
//!
//! Every edge incident to the current node is scored:
//! - `+1` when no turn is needed, otherwise the configured turn penalty
//! - `+1` when the destination node has not been visited
//! - `+1` when the edge has not been traversed, and another `+1` when that
//!   untraversed edge leads to a perimeter node
//!
//! The highest score wins; ties go to the smallest edge label.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::grid::{EdgeId, Heading, NodeId, Topology, turn_angle};

/// Penalty applied to candidates that require a turn.
///
/// Defaults to [`TurnPenalty::None`]: from node 0 heading North the legacy
/// right-only rule needs 12 hops to cover the grid, against 10 without a
/// penalty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPenalty {
    /// Turns cost nothing beyond losing the straight-ahead bonus
    #[default]
    None,
    /// Only right turns and reversals are penalized, by `angle / 90`
    RightOnly,
    /// Every turn is penalized by `|angle| / 90`
    Symmetric,
}

impl TurnPenalty {
    fn apply(self, angle: i32) -> i32 {
        match self {
            TurnPenalty::None => 0,
            TurnPenalty::RightOnly if angle > 0 => angle / 90,
            TurnPenalty::RightOnly => 0,
            TurnPenalty::Symmetric => angle.abs() / 90,
        }
    }
}

/// A candidate edge with its score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoredEdge {
    pub edge: EdgeId,
    pub destination: NodeId,
    /// Heading after traversing the edge
    pub heading: Heading,
    pub score: i32,
}

/// The selected next hop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HopPlan {
    pub edge: EdgeId,
    pub destination: NodeId,
    pub heading: Heading,
    /// Degrees to rotate before driving (0 when already aligned)
    pub turn_angle: i32,
    pub score: i32,
}

/// Greedy next-hop selector over the fixed topology.
#[derive(Clone, Debug)]
pub struct NavigationPlanner {
    topology: Topology,
    turn_penalty: TurnPenalty,
}

impl NavigationPlanner {
    pub fn new(topology: Topology, turn_penalty: TurnPenalty) -> Self {
        Self {
            topology,
            turn_penalty,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Score every edge leaving `current_node`, in topology order.
    pub fn score_candidates(
        &self,
        current_node: NodeId,
        current_heading: Heading,
        visited_nodes: &HashSet<NodeId>,
        visited_edges: &HashSet<EdgeId>,
    ) -> Vec<ScoredEdge> {
        self.topology
            .edges_of(current_node)
            .iter()
            .map(|&edge| {
                let destination = self.topology.other_endpoint(edge, current_node);
                let heading = self.topology.heading_of(edge, current_node);

                let mut score = 0;
                if heading == current_heading {
                    score += 1;
                } else {
                    score -= self.turn_penalty.apply(turn_angle(current_heading, heading));
                }

                if !visited_nodes.contains(&destination) {
                    score += 1;
                }

                if !visited_edges.contains(&edge) {
                    score += 1;
                    // Prefer continuing along the boundary over cutting through the center
                    if self.topology.is_perimeter_node(destination) {
                        score += 1;
                    }
                }

                ScoredEdge {
                    edge,
                    destination,
                    heading,
                    score,
                }
            })
            .collect()
    }

    /// Pick the best next hop from `current_node`.
    pub fn plan(
        &self,
        current_node: NodeId,
        current_heading: Heading,
        visited_nodes: &HashSet<NodeId>,
        visited_edges: &HashSet<EdgeId>,
    ) -> HopPlan {
        let candidates =
            self.score_candidates(current_node, current_heading, visited_nodes, visited_edges);

        // Every node has at least two incident edges
        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.score > best.score
                || (candidate.score == best.score && candidate.edge < best.edge)
            {
                best = *candidate;
            }
        }

        tracing::trace!(
            "Scored {} candidates at node {}: {:?}",
            candidates.len(),
            current_node,
            candidates
                .iter()
                .map(|c| (c.edge.label(), c.score))
                .collect::<Vec<_>>()
        );

        HopPlan {
            edge: best.edge,
            destination: best.destination,
            heading: best.heading,
            turn_angle: turn_angle(current_heading, best.heading),
            score: best.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u8) -> NodeId {
        NodeId::new(id).unwrap()
    }

    fn edge(label: char) -> EdgeId {
        EdgeId::new(label).unwrap()
    }

    fn planner(penalty: TurnPenalty) -> NavigationPlanner {
        NavigationPlanner::new(Topology::standard(), penalty)
    }

    #[test]
    fn test_corner_tie_breaks_to_smallest_label() {
        // From node 0 facing north both edges score 3: a (right turn) and c (reversal)
        let visited: HashSet<NodeId> = [node(0)].into();
        let plan =
            planner(TurnPenalty::None).plan(node(0), Heading::North, &visited, &HashSet::new());

        assert_eq!(plan.edge, edge('a'));
        assert_eq!(plan.destination, node(1));
        assert_eq!(plan.heading, Heading::East);
        assert_eq!(plan.turn_angle, 90);
        assert_eq!(plan.score, 3);
    }

    #[test]
    fn test_straight_ahead_bonus() {
        let visited: HashSet<NodeId> = [NodeId::CENTER].into();
        let plan = planner(TurnPenalty::None).plan(
            NodeId::CENTER,
            Heading::North,
            &visited,
            &HashSet::new(),
        );

        assert_eq!(plan.edge, edge('d'));
        assert_eq!(plan.heading, Heading::North);
        assert_eq!(plan.turn_angle, 0);
        assert_eq!(plan.score, 4);
    }

    #[test]
    fn test_turn_penalties() {
        let visited: HashSet<NodeId> = [node(0)].into();
        let none = HashSet::new();

        let scores = |penalty| {
            planner(penalty)
                .score_candidates(node(0), Heading::North, &visited, &none)
                .iter()
                .map(|c| (c.edge.label(), c.score))
                .collect::<Vec<_>>()
        };

        assert_eq!(scores(TurnPenalty::None), vec![('a', 3), ('c', 3)]);
        assert_eq!(scores(TurnPenalty::RightOnly), vec![('a', 2), ('c', 1)]);
        assert_eq!(scores(TurnPenalty::Symmetric), vec![('a', 2), ('c', 1)]);

        // Facing west at node 0
        let right_only = planner(TurnPenalty::RightOnly).score_candidates(
            node(0),
            Heading::West,
            &visited,
            &none,
        );
        // a is a reversal (+180 → -2), c is a left turn (no penalty under right-only)
        assert_eq!(right_only[0].score, 1);
        assert_eq!(right_only[1].score, 3);
    }

    #[test]
    fn test_center_destination_gets_no_perimeter_bonus() {
        let visited: HashSet<NodeId> = [node(1)].into();
        let candidates = planner(TurnPenalty::None).score_candidates(
            node(1),
            Heading::South,
            &visited,
            &HashSet::new(),
        );
        let d = candidates.iter().find(|c| c.edge == edge('d')).unwrap();
        let a = candidates.iter().find(|c| c.edge == edge('a')).unwrap();

        // d: straight (+1), unvisited center (+1), untraversed (+1), no perimeter bonus
        assert_eq!(d.score, 3);
        // a: turn, unvisited node 0 (+1), untraversed (+1), perimeter (+1)
        assert_eq!(a.score, 3);
    }

    #[test]
    fn test_visited_edges_lose_bonuses() {
        let visited_nodes: HashSet<NodeId> = [node(0), node(1), node(3)].into();
        let visited_edges: HashSet<EdgeId> = [edge('a')].into();
        let plan = planner(TurnPenalty::None).plan(
            node(0),
            Heading::West,
            &visited_nodes,
            &visited_edges,
        );

        // a: reversal, visited node, traversed edge → 0; c: untraversed perimeter edge → 2
        assert_eq!(plan.edge, edge('c'));
        assert_eq!(plan.score, 2);
        assert_eq!(plan.turn_angle, -90);
    }
}
