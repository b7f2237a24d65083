use serde::{Deserialize, Serialize};

/// Sub-pixel image coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Integer pixel position, truncated toward zero.
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

/// Axis-aligned bounding box in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Laser-dot estimate for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Centroid of the selected region.
    pub center: Point,
    /// Id of the selected region in this frame's region set.
    pub region_id: u32,
    /// Pixel count of the selected region.
    pub area: u32,
    pub bounds: Bounds,
    /// Radius of the marker drawn around `center`.
    pub marker_radius: u32,
}
