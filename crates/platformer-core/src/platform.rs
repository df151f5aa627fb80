//! Kinematic moving platforms.
//!
//! Platforms are velocity-based kinematic bodies that shuttle between two
//! boundaries per axis. A gated platform only moves while its linked button
//! is pressed. [`PlatformController::update`] runs once per frame between
//! physics steps and is the only code that writes platform velocities.

use std::collections::BTreeMap;

use rapier2d::prelude::{RigidBodyHandle, RigidBodySet, Vector};
use serde::{Deserialize, Serialize};

use crate::buttons::ButtonPresses;

/// Axis (or axes) a platform travels along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementAxis {
    Horizontal,
    Vertical,
    Diagonal,
}

impl MovementAxis {
    /// Maps the authoring code (1 horizontal, 2 vertical, 3 diagonal).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Horizontal),
            2 => Some(Self::Vertical),
            3 => Some(Self::Diagonal),
            _ => None,
        }
    }

    pub fn moves_horizontally(self) -> bool {
        matches!(self, Self::Horizontal | Self::Diagonal)
    }

    pub fn moves_vertically(self) -> bool {
        matches!(self, Self::Vertical | Self::Diagonal)
    }
}

/// Travel direction along one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Increasing,
    Decreasing,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Self::Increasing => 1.0,
            Self::Decreasing => -1.0,
        }
    }
}

/// Back-and-forth travel along a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTravel {
    pub low: f32,
    pub high: f32,
    /// Speed magnitude in world units per second.
    pub speed: f32,
    pub direction: Direction,
}

impl AxisTravel {
    /// Creates travel that starts in the increasing direction.
    pub fn new(low: f32, high: f32, speed: f32) -> Self {
        Self {
            low,
            high,
            speed,
            direction: Direction::Increasing,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.direction.sign() * self.speed
    }

    /// Turns around when an edge of the platform reaches a boundary.
    ///
    /// The low boundary is checked first. Evaluating twice at the same position
    /// gives the same direction.
    pub fn reverse_at_bounds(&mut self, position: f32, half_extent: f32) {
        if position - half_extent <= self.low {
            self.direction = Direction::Increasing;
        } else if position + half_extent >= self.high {
            self.direction = Direction::Decreasing;
        }
    }
}

/// Travel configuration of a platform, one variant per [`MovementAxis`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformTravel {
    Horizontal(AxisTravel),
    Vertical(AxisTravel),
    Diagonal {
        horizontal: AxisTravel,
        vertical: AxisTravel,
    },
}

impl PlatformTravel {
    pub fn axis(&self) -> MovementAxis {
        match self {
            Self::Horizontal(_) => MovementAxis::Horizontal,
            Self::Vertical(_) => MovementAxis::Vertical,
            Self::Diagonal { .. } => MovementAxis::Diagonal,
        }
    }

    pub fn horizontal(&self) -> Option<&AxisTravel> {
        match self {
            Self::Horizontal(travel) | Self::Diagonal { horizontal: travel, .. } => Some(travel),
            Self::Vertical(_) => None,
        }
    }

    pub fn vertical(&self) -> Option<&AxisTravel> {
        match self {
            Self::Vertical(travel) | Self::Diagonal { vertical: travel, .. } => Some(travel),
            Self::Horizontal(_) => None,
        }
    }

    /// Velocity for the current directions. Axes that do not move are zero.
    pub fn velocity(&self) -> Vector {
        Vector::new(
            self.horizontal().map_or(0.0, AxisTravel::velocity),
            self.vertical().map_or(0.0, AxisTravel::velocity),
        )
    }

    fn reverse_at_bounds(&mut self, position: [f32; 2], half_extents: [f32; 2]) {
        match self {
            Self::Horizontal(travel) => travel.reverse_at_bounds(position[0], half_extents[0]),
            Self::Vertical(travel) => travel.reverse_at_bounds(position[1], half_extents[1]),
            Self::Diagonal {
                horizontal,
                vertical,
            } => {
                horizontal.reverse_at_bounds(position[0], half_extents[0]);
                vertical.reverse_at_bounds(position[1], half_extents[1]);
            }
        }
    }
}

/// A moving platform built from level data.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformDefinition {
    /// Platform id, also the payload of the buttons linked to it.
    pub id: u32,
    /// Sprite reference for the renderer.
    pub tile_gid: u32,
    pub body: RigidBodyHandle,
    pub travel: PlatformTravel,
    pub uses_button_gate: bool,
    /// False only while gated and unpressed.
    pub active: bool,
    pub half_extents: [f32; 2],
}

impl PlatformDefinition {
    pub fn new(
        id: u32,
        tile_gid: u32,
        body: RigidBodyHandle,
        travel: PlatformTravel,
        uses_button_gate: bool,
        half_extents: [f32; 2],
    ) -> Self {
        Self {
            id,
            tile_gid,
            body,
            travel,
            uses_button_gate,
            active: !uses_button_gate,
            half_extents,
        }
    }

    pub fn axis(&self) -> MovementAxis {
        self.travel.axis()
    }

    /// Velocity the platform should have right now.
    pub fn velocity(&self) -> Vector {
        if self.active {
            self.travel.velocity()
        } else {
            Vector::new(0.0, 0.0)
        }
    }
}

/// Owns the platform definitions of a level and drives their bodies.
#[derive(Debug, Clone, Default)]
pub struct PlatformController {
    platforms: BTreeMap<u32, PlatformDefinition>,
}

impl PlatformController {
    pub fn new(platforms: impl IntoIterator<Item = PlatformDefinition>) -> Self {
        Self {
            platforms: platforms
                .into_iter()
                .map(|platform| (platform.id, platform))
                .collect(),
        }
    }

    /// Adds a platform, returning the previous one with the same id.
    pub fn insert(&mut self, platform: PlatformDefinition) -> Option<PlatformDefinition> {
        self.platforms.insert(platform.id, platform)
    }

    pub fn get(&self, id: u32) -> Option<&PlatformDefinition> {
        self.platforms.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.platforms.contains_key(&id)
    }

    /// Iterates over the platforms in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PlatformDefinition> {
        self.platforms.values()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Applies button gates and boundary reversal, then writes velocities.
    ///
    /// Must be called between physics steps. Gated platforms stop with zero
    /// velocity while unpressed and resume in their previous direction once
    /// pressed. Inactive platforms never evaluate boundaries, so releasing a
    /// button while the platform sits on a boundary leaves it stopped.
    pub fn update(&mut self, buttons: &impl ButtonPresses, bodies: &mut RigidBodySet) {
        for platform in self.platforms.values_mut() {
            let Some(body) = bodies.get_mut(platform.body) else {
                tracing::warn!("[platform] Platform {} has no body in the world", platform.id);
                continue;
            };

            if platform.uses_button_gate {
                let pressed = buttons.is_pressed(platform.id);
                if pressed != platform.active {
                    tracing::debug!(
                        "[platform] Platform {} {}",
                        platform.id,
                        if pressed { "started" } else { "stopped" }
                    );
                }
                platform.active = pressed;
            }

            if platform.active {
                let translation = body.translation();
                platform
                    .travel
                    .reverse_at_bounds([translation.x, translation.y], platform.half_extents);
            }

            body.set_linvel(platform.velocity(), true);
        }
    }
}
