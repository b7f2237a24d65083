//! Frame representation.
//!
//! - `Frame`: RGB processing representation (one per capture event).
//! - `FlipMode`: orientation fix-ups applied before processing and before display.
//!
//! Frames are plain `image` buffers. The pipeline never keeps a frame past the
//! cycle that produced it; the only state that survives a cycle is scratch
//! memory owned by the caller.

use image::{GenericImage, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_dimensions, VisionError};

/// RGB frame in processing order (R, G, B).
pub type Frame = RgbImage;

/// Display buffer handed to the rendering collaborator.
pub type DisplayBuffer = RgbaImage;

/// Default capture width.
pub const DEFAULT_WIDTH: u32 = 800;
/// Default capture height.
pub const DEFAULT_HEIGHT: u32 = 600;

/// Allocate a zeroed frame.
pub fn blank_frame(width: u32, height: u32) -> Frame {
    RgbImage::new(width, height)
}

/// Allocate a zeroed single-channel plane.
pub fn blank_plane(width: u32, height: u32) -> GrayImage {
    GrayImage::new(width, height)
}

/// Fail unless `frame` has exactly the configured capture size.
pub fn check_frame(frame: &Frame, width: u32, height: u32) -> Result<(), VisionError> {
    ensure_dimensions((width, height), frame.dimensions())
}

/// Axis flips. `Vertical` mirrors rows (flip around the x axis), `Horizontal`
/// mirrors columns, `Both` is a 180 degree rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipMode {
    #[default]
    None,
    Vertical,
    Horizontal,
    Both,
}

impl FlipMode {
    /// Flip `image` in place.
    pub fn apply<I: GenericImage>(self, image: &mut I) {
        match self {
            FlipMode::None => {}
            FlipMode::Vertical => image::imageops::flip_vertical_in_place(image),
            FlipMode::Horizontal => image::imageops::flip_horizontal_in_place(image),
            FlipMode::Both => image::imageops::rotate180_in_place(image),
        }
    }

    pub fn parse(value: &str) -> Result<Self, VisionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(FlipMode::None),
            "vertical" | "x" => Ok(FlipMode::Vertical),
            "horizontal" | "y" => Ok(FlipMode::Horizontal),
            "both" | "xy" => Ok(FlipMode::Both),
            other => Err(VisionError::InvalidConfig(format!(
                "unknown flip mode '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn flip_both_is_rotation() {
        let mut plane = blank_plane(3, 2);
        plane.put_pixel(0, 0, Luma([9]));
        FlipMode::Both.apply(&mut plane);
        assert_eq!(plane.get_pixel(2, 1)[0], 9);
        assert_eq!(plane.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn flip_vertical_mirrors_rows() {
        let mut frame = blank_frame(2, 3);
        frame.put_pixel(1, 0, Rgb([1, 2, 3]));
        FlipMode::Vertical.apply(&mut frame);
        assert_eq!(frame.get_pixel(1, 2), &Rgb([1, 2, 3]));
    }

    #[test]
    fn flip_none_leaves_frame_untouched() {
        let mut frame = blank_frame(2, 2);
        frame.put_pixel(0, 1, Rgb([5, 5, 5]));
        let before = frame.clone();
        FlipMode::None.apply(&mut frame);
        assert_eq!(frame, before);
    }

    #[test]
    fn parse_accepts_axis_aliases() {
        assert_eq!(FlipMode::parse("XY").unwrap(), FlipMode::Both);
        assert_eq!(FlipMode::parse("x").unwrap(), FlipMode::Vertical);
        assert!(FlipMode::parse("diagonal").is_err());
    }

    #[test]
    fn check_frame_rejects_wrong_size() {
        let frame = blank_frame(640, 480);
        assert!(check_frame(&frame, 800, 600).is_err());
        assert!(check_frame(&frame, 640, 480).is_ok());
    }
}
