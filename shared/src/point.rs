//! Pixel-space points.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    /// Create a new pixel point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in pixels
    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Bearing of `other` as seen from this point, measured from the
    /// downward image vertical: `atan2(dx, dy)` with y increasing down.
    ///
    /// This matches the simulated angle convention where theta is measured
    /// from the hanging rest position.
    pub fn bearing_to(&self, other: &PixelPoint) -> f64 {
        (other.x - self.x).atan2(other.y - self.y)
    }
}

impl From<(f64, f64)> for PixelPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}
