//! Per-frame processing with display output.
//!
//! Wraps [`LaserPipeline`] with the display path: input flip, edge image,
//! marker annotation, display flip and RGBA conversion. Frame, scratch and
//! RGBA buffers are allocated once for the configured frame size; only the
//! edge plane is rebuilt per frame.

use image::{GrayImage, RgbImage, RgbaImage};

use crate::convert::{frame_to_rgba, plane_to_rgba};
use crate::detect::Detection;
use crate::display::{annotate, edge_plane, DisplaySettings, Orientation};
use crate::error::{ensure_dimensions, VisionError};
use crate::pipeline::{DetectionSettings, LaserPipeline, Scratch};

pub struct FrameProcessor {
    pipeline: LaserPipeline,
    display: DisplaySettings,
    orientation: Orientation,
    scratch: Scratch,
    working: RgbImage,
    preview_rgba: RgbaImage,
    edges_rgba: RgbaImage,
}

impl FrameProcessor {
    pub fn new(
        detection: DetectionSettings,
        display: DisplaySettings,
        orientation: Orientation,
        width: u32,
        height: u32,
    ) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidConfig(format!(
                "frame size must be non-zero (got {width}x{height})"
            )));
        }
        display.validate()?;
        Ok(Self {
            pipeline: LaserPipeline::new(detection)?,
            display,
            orientation,
            scratch: Scratch::new(width, height),
            working: RgbImage::new(width, height),
            preview_rgba: RgbaImage::new(width, height),
            edges_rgba: RgbaImage::new(width, height),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.working.dimensions()
    }

    pub fn pipeline(&self) -> &LaserPipeline {
        &self.pipeline
    }

    /// Run detection on `frame` and refresh both display buffers.
    pub fn process(&mut self, frame: &RgbImage) -> Result<Option<Detection>, VisionError> {
        ensure_dimensions(self.dimensions(), frame.dimensions())?;

        self.working.copy_from_slice(frame);
        self.orientation.input_flip.apply(&mut self.working);

        let mut edges: GrayImage = edge_plane(
            &self.working,
            self.display.canny_low,
            self.display.canny_high,
        );
        let detection = self.pipeline.process_frame(&self.working, &mut self.scratch)?;

        annotate(detection.as_ref(), &mut self.working, &mut edges);
        self.orientation.display_flip.apply(&mut self.working);
        self.orientation.display_flip.apply(&mut edges);

        frame_to_rgba(&self.working, &mut self.preview_rgba)?;
        plane_to_rgba(&edges, &mut self.edges_rgba)?;
        Ok(detection)
    }

    /// Annotated colour preview of the last processed frame.
    pub fn preview(&self) -> &RgbaImage {
        &self.preview_rgba
    }

    /// Annotated edge image of the last processed frame.
    pub fn edges(&self) -> &RgbaImage {
        &self.edges_rgba
    }
}
