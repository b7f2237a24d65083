//! V4L2 frame source.
//!
//! This module provides `V4l2Source` for capturing frames from local V4L2
//! webcams (e.g. `/dev/video0`).
//!
//! The source asks the driver for `RGB3` at the configured size. Drivers
//! that only offer `YUYV` are converted on the fly; any other format or a
//! different negotiated size fails the connect. `stub://` paths fall back to
//! the synthetic scene.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::synthetic::{SyntheticConfig, SyntheticSource};
use super::{FrameSource, SourceStats};
use crate::convert::{to_frame, PixelFormat};
use crate::frame::Frame;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate. 0 keeps the driver default.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: crate::frame::DEFAULT_WIDTH,
            height: crate::frame::DEFAULT_HEIGHT,
        }
    }
}

/// V4L2 frame source.
///
/// Uses libv4l for real devices, with a synthetic fallback for `stub://` paths.
pub struct V4l2Source {
    backend: V4l2Backend,
}

enum V4l2Backend {
    Synthetic(SyntheticSource),
    Device(DeviceV4l2Source),
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        let backend = if config.device.starts_with("stub://") {
            V4l2Backend::Synthetic(SyntheticSource::new(SyntheticConfig {
                device: config.device,
                width: config.width,
                height: config.height,
                ..SyntheticConfig::default()
            }))
        } else {
            V4l2Backend::Device(DeviceV4l2Source::new(config))
        };
        Ok(Self { backend })
    }

    fn inner(&self) -> &dyn FrameSource {
        match &self.backend {
            V4l2Backend::Synthetic(source) => source,
            V4l2Backend::Device(source) => source,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FrameSource {
        match &mut self.backend {
            V4l2Backend::Synthetic(source) => source,
            V4l2Backend::Device(source) => source,
        }
    }
}

impl FrameSource for V4l2Source {
    fn connect(&mut self) -> Result<()> {
        self.inner_mut().connect()
    }

    fn is_available(&self) -> bool {
        self.inner().is_available()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.inner().dimensions()
    }

    fn poll_frame(&mut self, dst: &mut Frame) -> Result<bool> {
        self.inner_mut().poll_frame(dst)
    }

    fn stats(&self) -> SourceStats {
        self.inner().stats()
    }
}

// ----------------------------------------------------------------------------
// Production V4L2 source using libv4l
// ----------------------------------------------------------------------------

struct DeviceV4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    pixel_format: PixelFormat,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceV4l2Source {
    fn new(config: V4l2Config) -> Self {
        Self {
            config,
            state: None,
            pixel_format: PixelFormat::Rgb24,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn negotiate(&mut self, device: &mut v4l::Device) -> Result<()> {
        use v4l::video::Capture;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        self.pixel_format = if format.fourcc == v4l::FourCC::new(b"RGB3") {
            PixelFormat::Rgb24
        } else if format.fourcc == v4l::FourCC::new(b"YUYV") {
            log::warn!(
                "V4l2Source: {} does not offer RGB3, converting from YUYV",
                self.config.device
            );
            PixelFormat::Yuyv
        } else {
            return Err(anyhow!(
                "unsupported v4l2 pixel format {} on {}",
                format.fourcc,
                self.config.device
            ));
        };

        if (format.width, format.height) != (self.config.width, self.config.height) {
            return Err(anyhow!(
                "{} negotiated {}x{}, expected {}x{}",
                self.config.device,
                format.width,
                format.height,
                self.config.width,
                self.config.height
            ));
        }

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }
        Ok(())
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

impl FrameSource for DeviceV4l2Source {
    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;

        let mut device = match v4l::Device::with_path(&self.config.device) {
            Ok(device) => device,
            Err(err) => {
                log::warn!(
                    "V4l2Source: camera {} unavailable: {}",
                    self.config.device,
                    err
                );
                self.last_error = Some(err.to_string());
                return Ok(());
            }
        };
        self.negotiate(&mut device)?;
        self.last_error = None;

        let state = DeviceV4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.config.width,
            self.config.height,
            self.pixel_format
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        if self.state.is_none() || self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn poll_frame(&mut self, dst: &mut Frame) -> Result<bool> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.config.width, self.config.height, self.pixel_format);
        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let captured = state.with_mut(|fields| -> Result<()> {
            let (buf, _meta) = fields
                .stream
                .next()
                .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
            // Drivers may hand out page-padded buffers.
            let expected = width as usize * height as usize * format.bytes_per_pixel();
            to_frame(buf.get(..expected).unwrap_or(buf), width, height, format, dst)?;
            Ok(())
        });
        if let Err(err) = captured {
            self.last_error = Some(err.to_string());
            return Err(err);
        }

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Ok(true)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
