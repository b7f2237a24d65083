//! Per-frame laser-dot localisation.
//!
//! `LaserPipeline::process_frame` is the whole detection contract: one frame
//! in, zero or one point out. The pipeline itself is immutable; every buffer
//! it writes lives in a caller-supplied [`Scratch`], so two calls on the same
//! frame see identical inputs and produce identical results.

use image::{GrayImage, RgbImage};

use crate::detect::{
    extract_channel, isolate_blobs, label_regions, BinaryMask, BlobParams, BlobScratch,
    ColorChannel, Connectivity, Detection, LabeledRegions, SelectionPolicy,
};
use crate::error::{ensure_dimensions, VisionError};

/// Marker radius drawn around a detection.
pub const DEFAULT_MARKER_RADIUS: u32 = 20;
/// Largest accepted marker radius.
pub const MAX_MARKER_RADIUS: u32 = 4096;

/// Detection configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSettings {
    pub channel: ColorChannel,
    pub blob: BlobParams,
    pub connectivity: Connectivity,
    pub policy: SelectionPolicy,
    pub marker_radius: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            channel: ColorChannel::Red,
            blob: BlobParams::default(),
            connectivity: Connectivity::Eight,
            policy: SelectionPolicy::LargestArea,
            marker_radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

impl DetectionSettings {
    pub fn validate(&self) -> Result<(), VisionError> {
        self.blob.validate()?;
        if self.marker_radius > MAX_MARKER_RADIUS {
            return Err(VisionError::InvalidConfig(format!(
                "marker_radius must be at most {MAX_MARKER_RADIUS} (got {})",
                self.marker_radius
            )));
        }
        Ok(())
    }
}

/// Reusable buffers for one frame size.
#[derive(Debug)]
pub struct Scratch {
    plane: GrayImage,
    blob: BlobScratch,
    mask: BinaryMask,
}

impl Scratch {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            plane: GrayImage::new(width, height),
            blob: BlobScratch::new(width, height),
            mask: BinaryMask::new(width, height),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.plane.dimensions()
    }

    /// Mask produced by the last run.
    pub fn mask(&self) -> &BinaryMask {
        &self.mask
    }

    /// Channel plane produced by the last run.
    pub fn plane(&self) -> &GrayImage {
        &self.plane
    }
}

/// Region set and selection for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAnalysis {
    pub regions: LabeledRegions,
    pub detection: Option<Detection>,
}

#[derive(Clone, Debug)]
pub struct LaserPipeline {
    settings: DetectionSettings,
}

impl LaserPipeline {
    pub fn new(settings: DetectionSettings) -> Result<Self, VisionError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Channel extraction, blob isolation and labelling.
    pub fn label(
        &self,
        frame: &RgbImage,
        scratch: &mut Scratch,
    ) -> Result<LabeledRegions, VisionError> {
        ensure_dimensions(scratch.dimensions(), frame.dimensions())?;
        extract_channel(frame, self.settings.channel, &mut scratch.plane)?;
        isolate_blobs(
            &scratch.plane,
            &self.settings.blob,
            &mut scratch.blob,
            &mut scratch.mask,
        )?;
        Ok(label_regions(&scratch.mask, self.settings.connectivity))
    }

    /// Full analysis: labelled regions plus the selected detection.
    pub fn analyze(
        &self,
        frame: &RgbImage,
        scratch: &mut Scratch,
    ) -> Result<FrameAnalysis, VisionError> {
        let regions = self.label(frame, scratch)?;
        let detection = self.settings.policy.select(&regions).map(|region| Detection {
            center: region.centroid,
            region_id: region.id,
            area: region.area,
            bounds: region.bounds,
            marker_radius: self.settings.marker_radius,
        });
        Ok(FrameAnalysis { regions, detection })
    }

    /// Laser-dot estimate for `frame`, or `None` when nothing is bright enough.
    pub fn process_frame(
        &self,
        frame: &RgbImage,
        scratch: &mut Scratch,
    ) -> Result<Option<Detection>, VisionError> {
        Ok(self.analyze(frame, scratch)?.detection)
    }
}
