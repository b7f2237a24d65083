//! Laser-dot detection for live camera frames.
//!
//! Finds the brightest spot of one colour channel in each frame and reports
//! its centroid, then produces two annotated display images.
//!
//! # Pipeline
//!
//! 1. **Channel**: one colour plane is copied out of the RGB frame.
//! 2. **Blob isolation**: binary threshold, Gaussian blur, re-threshold.
//!    Isolated hot pixels vanish; a real dot survives as a solid blob.
//! 3. **Labelling**: connected components with per-region area, bounds and
//!    centroid. The background region is tagged explicitly.
//! 4. **Selection**: at most one foreground region wins (largest area by
//!    default).
//!
//! The display path draws a ring around the detection on the colour preview
//! and on a Canny edge image, flips both for presentation and hands them to
//! a [`DisplaySurface`] as RGBA.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (synthetic, V4L2, still-image replay)
//! - `convert`: row-parallel pixel conversions
//! - `detect`: the four detection stages
//! - `pipeline` / `processor`: per-frame orchestration with reused buffers
//! - `display`: annotation, edges, display surfaces
//! - `runtime`: host-driven update loop

pub mod config;
pub mod convert;
pub mod detect;
pub mod display;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod processor;
pub mod runtime;

pub use config::{LaserdotConfig, SourceSettings};
pub use detect::{
    BinaryMask, BlobParams, Bounds, ColorChannel, Connectivity, Detection, LabeledRegions, Point,
    Region, RegionKind, SelectionPolicy,
};
pub use display::{DisplaySettings, DisplaySurface, HeldFrames, NullSurface, Orientation};
pub use error::VisionError;
pub use frame::{FlipMode, Frame};
pub use ingest::{open_source, FrameSource, SourceStats};
pub use pipeline::{DetectionSettings, LaserPipeline, Scratch};
pub use processor::FrameProcessor;
pub use runtime::{CycleOutcome, FrameLoop, LoopStats};
