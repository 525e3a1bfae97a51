//! Fixed 3×3 topology of the search area.
//!
//! ```text
//!   0 ---- a ---- 1 ---- b ---- 2        North
//!   |             |             |          ^
//!   c             d             e          |
//!   |             |             |
//!   3 ---- f ---- 4 ---- g ---- 5
//!   |             |             |
//!   h             i             j
//!   |             |             |
//!   6 ---- k ---- 7 ---- l ---- 8        South
//! ```
//!
//! Edge sources are the north/west-most endpoint; the canonical heading is
//! the direction of travel from source to destination.

use super::heading::Heading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of nodes in the grid.
pub const NODE_COUNT: usize = 9;

/// Number of edges in the grid.
pub const EDGE_COUNT: usize = 12;

/// Number of edges on the outer boundary.
pub const PERIMETER_EDGE_COUNT: usize = 8;

/// Node identifier in `0..9`, numbered row by row from the northwest corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u8);

impl NodeId {
    pub const CENTER: NodeId = NodeId(4);

    /// Node for a raw id, `None` outside `0..9`.
    pub fn new(id: u8) -> Option<Self> {
        ((id as usize) < NODE_COUNT).then_some(Self(id))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Every node in id order.
    pub fn all() -> impl Iterator<Item = NodeId> {
        (0..NODE_COUNT as u8).map(NodeId)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edge label `a..=l`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(char);

impl EdgeId {
    /// Edge for a label, `None` outside `a..=l`.
    pub fn new(label: char) -> Option<Self> {
        ('a'..='l').contains(&label).then_some(Self(label))
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 as u8 - b'a') as usize
    }

    #[inline]
    pub fn label(self) -> char {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point of the search area with its incident edges.
#[derive(Debug)]
pub struct GridNode {
    pub id: NodeId,
    pub edges: &'static [EdgeId],
}

impl GridNode {
    #[inline]
    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

/// A connection between two adjacent nodes.
#[derive(Debug)]
pub struct GridEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub destination: NodeId,
    /// Direction of travel from source to destination
    pub heading: Heading,
    pub description: &'static str,
}

const fn edge(
    label: char,
    source: u8,
    destination: u8,
    heading: Heading,
    description: &'static str,
) -> GridEdge {
    GridEdge {
        id: EdgeId(label),
        source: NodeId(source),
        destination: NodeId(destination),
        heading,
        description,
    }
}

static EDGES: [GridEdge; EDGE_COUNT] = [
    edge('a', 0, 1, Heading::East, "northwest to north"),
    edge('b', 1, 2, Heading::East, "north to northeast"),
    edge('c', 0, 3, Heading::South, "northwest to west"),
    edge('d', 1, 4, Heading::South, "north to center"),
    edge('e', 2, 5, Heading::South, "northeast to east"),
    edge('f', 3, 4, Heading::East, "west to center"),
    edge('g', 4, 5, Heading::East, "center to east"),
    edge('h', 3, 6, Heading::South, "west to southwest"),
    edge('i', 4, 7, Heading::South, "center to south"),
    edge('j', 5, 8, Heading::South, "east to southeast"),
    edge('k', 6, 7, Heading::East, "southwest to south"),
    edge('l', 7, 8, Heading::East, "south to southeast"),
];

const A: EdgeId = EdgeId('a');
const B: EdgeId = EdgeId('b');
const C: EdgeId = EdgeId('c');
const D: EdgeId = EdgeId('d');
const E: EdgeId = EdgeId('e');
const F: EdgeId = EdgeId('f');
const G: EdgeId = EdgeId('g');
const H: EdgeId = EdgeId('h');
const I: EdgeId = EdgeId('i');
const J: EdgeId = EdgeId('j');
const K: EdgeId = EdgeId('k');
const L: EdgeId = EdgeId('l');

static NODES: [GridNode; NODE_COUNT] = [
    GridNode { id: NodeId(0), edges: &[A, C] },
    GridNode { id: NodeId(1), edges: &[A, B, D] },
    GridNode { id: NodeId(2), edges: &[B, E] },
    GridNode { id: NodeId(3), edges: &[C, F, H] },
    GridNode { id: NodeId(4), edges: &[D, G, I, F] },
    GridNode { id: NodeId(5), edges: &[E, G, J] },
    GridNode { id: NodeId(6), edges: &[H, K] },
    GridNode { id: NodeId(7), edges: &[K, I, L] },
    GridNode { id: NodeId(8), edges: &[J, L] },
];

static QUADRANTS: [&str; NODE_COUNT] = [
    "northwest",
    "north",
    "northeast",
    "west",
    "center",
    "east",
    "southwest",
    "south",
    "southeast",
];

/// Human-readable name of a node, for diagnostics and reports.
pub fn quadrant_label(node: NodeId) -> &'static str {
    QUADRANTS[node.index()]
}

/// Read-only view over the static node and edge tables.
#[derive(Clone, Copy, Debug)]
pub struct Topology {
    nodes: &'static [GridNode; NODE_COUNT],
    edges: &'static [GridEdge; EDGE_COUNT],
}

impl Default for Topology {
    fn default() -> Self {
        Self::standard()
    }
}

impl Topology {
    /// The 3×3 search grid.
    pub fn standard() -> Self {
        Self {
            nodes: &NODES,
            edges: &EDGES,
        }
    }

    pub fn nodes(&self) -> &'static [GridNode] {
        self.nodes
    }

    pub fn edges(&self) -> &'static [GridEdge] {
        self.edges
    }

    pub fn node(&self, id: NodeId) -> &'static GridNode {
        &self.nodes[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &'static GridEdge {
        &self.edges[id.index()]
    }

    /// Incident edges of a node, in table order.
    pub fn edges_of(&self, node: NodeId) -> &'static [EdgeId] {
        self.nodes[node.index()].edges
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.nodes[node.index()].degree()
    }

    /// The endpoint of `edge` that is not `node`.
    pub fn other_endpoint(&self, edge: EdgeId, node: NodeId) -> NodeId {
        let e = self.edge(edge);
        debug_assert!(e.source == node || e.destination == node);
        if e.source == node {
            e.destination
        } else {
            e.source
        }
    }

    /// Heading when `edge` is traveled starting from `traveled_from`.
    ///
    /// Leaving from the destination (higher id) end reverses the canonical heading.
    pub fn heading_of(&self, edge: EdgeId, traveled_from: NodeId) -> Heading {
        let e = self.edge(edge);
        if traveled_from == e.source {
            e.heading
        } else {
            e.heading.complement()
        }
    }

    pub fn is_perimeter_node(&self, node: NodeId) -> bool {
        self.degree(node) < 4
    }

    pub fn is_perimeter_edge(&self, edge: EdgeId) -> bool {
        let e = self.edge(edge);
        self.is_perimeter_node(e.source) && self.is_perimeter_node(e.destination)
    }

    /// Edge connecting two nodes, if they are adjacent.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.edges_of(a)
            .iter()
            .copied()
            .find(|&e| self.other_endpoint(e, a) == b)
    }
}
