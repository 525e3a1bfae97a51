//! Cardinal headings and turn-angle lookup.
//!
//! Turn angles are signed degrees: right (clockwise) turns are positive,
//! left turns negative. A reversal is always reported as `+180`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardinal direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Heading {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Heading {
    /// All headings in index order.
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    /// Heading for an index in `0..4`.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// The 180° opposite heading, used when an edge is traveled backwards.
    pub fn complement(self) -> Self {
        Self::ALL[((self.index() + 2) % 4) as usize]
    }

    /// East/west headings (odd indices) run along the grid width.
    #[inline]
    pub fn is_east_west(self) -> bool {
        self.index() % 2 == 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Heading::North => "north",
            Heading::East => "east",
            Heading::South => "south",
            Heading::West => "west",
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signed degrees to rotate from `from` to face `to`.
pub fn turn_angle(from: Heading, to: Heading) -> i32 {
    match (to.index() + 4 - from.index()) % 4 {
        0 => 0,
        1 => 90,
        2 => 180,
        _ => -90,
    }
}

/// Rotation direction of a point turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    #[default]
    Right,
    Left,
}

impl TurnDirection {
    /// Sign applied to a turn magnitude (right is positive).
    pub fn sign(self) -> f32 {
        match self {
            TurnDirection::Right => 1.0,
            TurnDirection::Left => -1.0,
        }
    }

    /// Direction of a signed turn angle.
    pub fn of_degrees(degrees: f32) -> Self {
        if degrees >= 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            TurnDirection::Right => TurnDirection::Left,
            TurnDirection::Left => TurnDirection::Right,
        }
    }
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDirection::Right => f.write_str("right"),
            TurnDirection::Left => f.write_str("left"),
        }
    }
}
