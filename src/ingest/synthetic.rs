//! Synthetic frame source (`stub://` devices).
//!
//! Renders a dark, slightly noisy scene with a saturated red dot moving on a
//! Lissajous path. The dot position for any frame is available through
//! [`SyntheticSource::dot_center`] so tests can check the detector against
//! ground truth.
//!
//! `stub://offline` behaves like an unplugged camera.

use anyhow::Result;
use image::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Device string that simulates a missing camera.
pub const OFFLINE_DEVICE: &str = "stub://offline";

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
    /// Dot radius in pixels.
    pub dot_radius: u32,
    /// Peak background noise (0 = clean frames).
    pub noise: u8,
    /// Every n-th frame has the laser switched off (0 = never).
    pub dark_every: u64,
    /// A new frame is ready every n-th poll.
    pub polls_per_frame: u32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            device: "stub://laser".to_string(),
            width: crate::frame::DEFAULT_WIDTH,
            height: crate::frame::DEFAULT_HEIGHT,
            dot_radius: 6,
            noise: 30,
            dark_every: 50,
            polls_per_frame: 1,
            seed: 7,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    connected: bool,
    polls: u64,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            connected: false,
            polls: 0,
            frame_count: 0,
        }
    }

    /// Dot centre of frame `index` (1-based), or `None` when the laser is off.
    pub fn dot_center(&self, index: u64) -> Option<(i64, i64)> {
        if self.config.dark_every > 0 && index % self.config.dark_every == 0 {
            return None;
        }
        let (w, h) = (self.config.width as f64, self.config.height as f64);
        let margin = self.config.dot_radius as f64 + 2.0;
        let t = index as f64 * 0.05;
        let x = w / 2.0 + (w / 2.0 - margin).max(0.0) * 0.8 * (t * 1.3).sin();
        let y = h / 2.0 + (h / 2.0 - margin).max(0.0) * 0.8 * (t * 0.7).cos();
        Some((x.round() as i64, y.round() as i64))
    }

    fn render(&mut self, dst: &mut Frame) {
        let noise = self.config.noise;
        for px in dst.pixels_mut() {
            let n = if noise == 0 {
                0
            } else {
                self.rng.gen_range(0..=noise)
            };
            *px = Rgb([n, n, n]);
        }

        let Some((cx, cy)) = self.dot_center(self.frame_count) else {
            return;
        };
        let r = self.config.dot_radius as i64;
        let (w, h) = (dst.width() as i64, dst.height() as i64);
        for y in (cy - r).max(0)..=(cy + r).min(h - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(w - 1) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= r * r {
                    dst.put_pixel(x as u32, y as u32, Rgb([255, 64, 64]));
                }
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        if self.config.device == OFFLINE_DEVICE {
            log::warn!("SyntheticSource: {} has no camera attached", self.config.device);
            return Ok(());
        }
        self.connected = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.connected
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn poll_frame(&mut self, dst: &mut Frame) -> Result<bool> {
        if !self.connected {
            return Ok(false);
        }
        self.polls += 1;
        if self.polls % self.config.polls_per_frame.max(1) as u64 != 0 {
            return Ok(false);
        }
        crate::frame::check_frame(dst, self.config.width, self.config.height)?;
        self.frame_count += 1;
        self.render(dst);
        Ok(true)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}
