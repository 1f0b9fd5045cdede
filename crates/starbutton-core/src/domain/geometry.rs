//! Screen coordinates.

use serde::{Deserialize, Serialize};

/// A point in desktop pixel coordinates.  The primary monitor's top-left
/// corner is (0, 0); monitors to the left or above have negative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`, `t` clamped to `[0, 1]`.
    ///
    /// The result is rounded to the nearest pixel, so `lerp(other, 1.0)` is
    /// exactly `other`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let x = f64::from(self.x) + (f64::from(other.x) - f64::from(self.x)) * t;
        let y = f64::from(self.y) + (f64::from(other.y) - f64::from(self.y)) * t;
        Point::new(x.round() as i32, y.round() as i32)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
