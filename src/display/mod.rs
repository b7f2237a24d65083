//! Display boundary.
//!
//! The processor hands two RGBA buffers per frame to a [`DisplaySurface`]:
//! the annotated colour preview and the annotated edge image. Window and
//! texture lifecycles belong to the surface, not to this crate.

mod annotate;
mod edges;

use std::collections::HashMap;

use anyhow::Result;
use image::RgbaImage;

use crate::error::VisionError;
use crate::frame::{DisplayBuffer, FlipMode};

pub use annotate::{annotate, MARKER_LUMA, MARKER_RGB};
pub use edges::edge_plane;

/// Window showing the annotated colour preview.
pub const PREVIEW_WINDOW: &str = "SuperLaserDetect";
/// Window showing the annotated edge image.
pub const EDGES_WINDOW: &str = "Processed WebCam";

#[derive(Clone, Debug, PartialEq)]
pub struct DisplaySettings {
    /// Canny hysteresis thresholds for the edge window.
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            canny_low: 100.0,
            canny_high: 100.0,
        }
    }
}

impl DisplaySettings {
    /// Canny thresholds must be finite, non-negative and ordered.
    pub fn validate(&self) -> std::result::Result<(), VisionError> {
        let (low, high) = (self.canny_low, self.canny_high);
        if !(low.is_finite() && high.is_finite() && low >= 0.0 && low <= high) {
            return Err(VisionError::InvalidConfig(format!(
                "canny thresholds need 0 <= low <= high (got low={low}, high={high})"
            )));
        }
        Ok(())
    }
}

/// Orientation fix-ups around the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Orientation {
    /// Applied to each captured frame before processing.
    pub input_flip: FlipMode,
    /// Applied to both display buffers after annotation.
    pub display_flip: FlipMode,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            input_flip: FlipMode::None,
            display_flip: FlipMode::Both,
        }
    }
}

/// Rendering collaborator.
pub trait DisplaySurface {
    /// Show `buffer` in `window`. Called once per window per processed frame.
    fn present(&mut self, window: &str, buffer: &DisplayBuffer) -> Result<()>;
}

/// Surface that keeps the latest buffer of every window in memory.
///
/// When no new frame arrives the previously presented buffer stays current.
#[derive(Default)]
pub struct HeldFrames {
    windows: HashMap<String, RgbaImage>,
    presented: u64,
}

impl HeldFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, window: &str) -> Option<&RgbaImage> {
        self.windows.get(window)
    }

    /// Number of `present` calls so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySurface for HeldFrames {
    fn present(&mut self, window: &str, buffer: &DisplayBuffer) -> Result<()> {
        match self.windows.get_mut(window) {
            Some(held) if held.dimensions() == buffer.dimensions() => {
                held.copy_from_slice(buffer);
            }
            _ => {
                self.windows.insert(window.to_string(), buffer.clone());
            }
        }
        self.presented += 1;
        Ok(())
    }
}

/// Surface that discards everything. Used by headless runs.
#[derive(Default)]
pub struct NullSurface;

impl DisplaySurface for NullSurface {
    fn present(&mut self, _window: &str, _buffer: &DisplayBuffer) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn held_frames_keep_latest_per_window() -> Result<()> {
        let mut surface = HeldFrames::new();
        let first = RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 255]));
        let second = RgbaImage::from_pixel(2, 2, Rgba([2, 2, 2, 255]));

        surface.present(PREVIEW_WINDOW, &first)?;
        surface.present(EDGES_WINDOW, &first)?;
        surface.present(PREVIEW_WINDOW, &second)?;

        assert_eq!(surface.latest(PREVIEW_WINDOW), Some(&second));
        assert_eq!(surface.latest(EDGES_WINDOW), Some(&first));
        assert_eq!(surface.presented(), 3);
        assert!(surface.latest("missing").is_none());
        Ok(())
    }

    #[test]
    fn canny_thresholds_are_validated() {
        assert!(DisplaySettings::default().validate().is_ok());
        for (low, high) in [(200.0, 100.0), (f32::NAN, 100.0), (0.0, f32::INFINITY), (-1.0, 5.0)] {
            let settings = DisplaySettings {
                canny_low: low,
                canny_high: high,
            };
            assert!(settings.validate().is_err(), "low={low} high={high}");
        }
    }

    #[test]
    fn held_frames_replace_on_resize() -> Result<()> {
        let mut surface = HeldFrames::new();
        surface.present(PREVIEW_WINDOW, &RgbaImage::new(2, 2))?;
        surface.present(PREVIEW_WINDOW, &RgbaImage::new(4, 3))?;
        assert_eq!(
            surface.latest(PREVIEW_WINDOW).map(|b| b.dimensions()),
            Some((4, 3))
        );
        Ok(())
    }
}
