// Scalar and shape primitives shared across the simulation.

use serde::{Deserialize, Serialize};

/// Rounds to 6 decimal places; applied to every externally reported coordinate.
pub fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

/// A point in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn rounded(self) -> Self {
        Self {
            x: round6(self.x),
            y: round6(self.y),
        }
    }
}

/// Velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub vx: f64,
    pub vy: f64,
}

impl Speed {
    pub const ZERO: Speed = Speed { vx: 0.0, vy: 0.0 };

    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn rounded(self) -> Self {
        Self {
            vx: round6(self.vx),
            vy: round6(self.vy),
        }
    }
}

/// Integer tile offset, kept as floats to match the wire shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub position: Position,
    pub size: Size,
}

/// Facing of a dog; N is negative y, S positive y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    West,
    East,
}

/// Outcome of a road-constrained move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub position: Position,
    pub hit_boundary: bool,
}
