//! Frame ingestion sources.
//!
//! This module provides different sources for RGB frames:
//! - Synthetic scenes (`stub://` devices, testing)
//! - USB/V4L2 webcams (feature: ingest-v4l2)
//! - Still-image directories (offline replay)
//!
//! Every source delivers frames of one fixed size into a caller-owned
//! buffer. "No new frame yet" and "camera unavailable" are reported
//! separately so the loop can keep the previous display up.
//!
//! The ingestion layer MUST NOT:
//! - Store frames to disk
//! - Retain frames beyond the poll that delivered them

pub mod file;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::SourceSettings;
use crate::frame::Frame;

pub use file::{FileConfig, FileSource};
pub use synthetic::{SyntheticConfig, SyntheticSource, OFFLINE_DEVICE};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Counters reported by every source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Camera boundary.
pub trait FrameSource {
    /// Open the underlying device. A missing camera is not an error; the
    /// source simply stays unavailable.
    fn connect(&mut self) -> Result<()>;

    fn is_available(&self) -> bool;

    /// Frame size written by [`FrameSource::poll_frame`].
    fn dimensions(&self) -> (u32, u32);

    /// Write the next frame into `dst`. Returns `false` when no new frame
    /// is ready; `dst` is left untouched in that case.
    fn poll_frame(&mut self, dst: &mut Frame) -> Result<bool>;

    fn stats(&self) -> SourceStats;
}

/// Build the source named by `settings.device`.
///
/// `stub://...` selects the synthetic scene, `/dev/video*` a V4L2 camera and
/// an existing directory the still-image replay.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let device = settings.device.as_str();
    if device.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(SyntheticConfig {
            device: settings.device.clone(),
            width: settings.width,
            height: settings.height,
            ..SyntheticConfig::default()
        })));
    }
    if device.starts_with("/dev/video") {
        return open_v4l2(settings);
    }
    if Path::new(device).is_dir() {
        return Ok(Box::new(FileSource::new(FileConfig {
            path: device.into(),
            width: settings.width,
            height: settings.height,
            repeat: settings.repeat,
        })?));
    }
    Err(anyhow!(
        "unsupported source device {device:?} (expected stub://, /dev/videoN or a frame directory)"
    ))
}

#[cfg(feature = "ingest-v4l2")]
fn open_v4l2(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(V4l2Source::new(V4l2Config {
        device: settings.device.clone(),
        target_fps: settings.target_fps,
        width: settings.width,
        height: settings.height,
    })?))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_v4l2(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "{} requires the ingest-v4l2 feature",
        settings.device
    ))
}
