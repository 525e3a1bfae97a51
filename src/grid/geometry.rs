//! Runtime grid geometry: area size, wheel calibration and starting pose.

use super::heading::Heading;
use super::topology::{NodeId, quadrant_label};
use crate::config::{GridConfig, RobotConfig};
use crate::error::{KhojError, Result};

/// Dimensions and pose used by the next planning cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    pub width_ft: f32,
    pub height_ft: f32,
    pub inches_per_rotation: f32,
    pub starting_position: NodeId,
    /// Last known node, set by `set_grid` or a finished perimeter walk
    pub current_position: Option<NodeId>,
    pub heading: Heading,
}

impl GridGeometry {
    pub fn new(grid: &GridConfig, robot: &RobotConfig) -> Self {
        let starting_position = NodeId::new(grid.starting_position).unwrap_or(NodeId::CENTER);
        Self {
            width_ft: grid.width_ft,
            height_ft: grid.height_ft,
            inches_per_rotation: robot.inches_per_rotation,
            starting_position,
            current_position: None,
            heading: infer_heading(starting_position),
        }
    }

    /// Node a new perimeter walk starts from.
    pub fn start_node(&self) -> NodeId {
        self.current_position.unwrap_or(self.starting_position)
    }

    pub fn set_width(&mut self, feet: f32) -> Result<()> {
        if feet.is_nan() || feet <= 0.0 {
            return Err(KhojError::Config(format!("Grid width must be positive, got {}", feet)));
        }
        self.width_ft = feet;
        Ok(())
    }

    pub fn set_height(&mut self, feet: f32) -> Result<()> {
        if feet.is_nan() || feet <= 0.0 {
            return Err(KhojError::Config(format!("Grid height must be positive, got {}", feet)));
        }
        self.height_ft = feet;
        Ok(())
    }

    /// Move the starting position and infer the heading the robot faces.
    ///
    /// Out-of-range positions leave the geometry untouched.
    pub fn set_position(&mut self, position: i64) -> Result<Heading> {
        let node = u8::try_from(position)
            .ok()
            .and_then(NodeId::new)
            .ok_or_else(|| {
                KhojError::Config(format!("Grid position {} is outside 0..9", position))
            })?;

        let heading = infer_heading(node);
        self.starting_position = node;
        self.current_position = Some(node);
        self.heading = heading;
        tracing::info!(
            "Grid position set to {} ({}), heading {}",
            node,
            quadrant_label(node),
            heading
        );
        Ok(heading)
    }

    /// Record where a run left the robot.
    pub fn set_pose(&mut self, node: NodeId, heading: Heading) {
        self.current_position = Some(node);
        self.heading = heading;
    }

    /// Inches covered by one hop (half the grid dimension along the travel axis).
    pub fn leg_inches(&self, heading: Heading) -> f32 {
        let feet = if heading.is_east_west() {
            self.width_ft
        } else {
            self.height_ft
        };
        feet * 12.0 / 2.0
    }

    /// Wheel rotations for one hop traveled along `heading`.
    pub fn leg_rotations(&self, heading: Heading) -> f32 {
        self.leg_inches(heading) / self.inches_per_rotation
    }
}

/// Heading assumed for a starting node: facing into the grid.
///
/// The center faces north, the north row faces south, the south row faces
/// north, and the east/west midpoints face across the grid.
pub fn infer_heading(node: NodeId) -> Heading {
    match node.value() {
        4 => Heading::North,
        0..=2 => Heading::South,
        6..=8 => Heading::North,
        5 => Heading::West,
        _ => Heading::East,
    }
}
