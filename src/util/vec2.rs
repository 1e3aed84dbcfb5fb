//! Integer 2-D vector for pixel coordinates

use serde::{Deserialize, Serialize};

/// A 2-D vector in pixel units. Used for positions, direction vectors and
/// motion deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i64,
    pub y: i64,
}

impl Vec2 {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Componentwise product, used to scale a motion delta by a direction
    /// vector.
    pub fn scale(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x * other.x, self.y * other.y)
    }

    pub fn add(&mut self, other: Vec2) {
        self.x += other.x;
        self.y += other.y;
    }
}
