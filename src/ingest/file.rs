//! Still-image replay source.
//!
//! Reads PNG/JPEG files from a local directory in name order and hands them
//! out one per poll. Every image must already have the configured frame size.
//! Nothing is written back; the directory is only ever read.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::error::VisionError;
use crate::frame::Frame;

#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Directory holding the frames.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Start over after the last image instead of going unavailable.
    pub repeat: bool,
}

pub struct FileSource {
    config: FileConfig,
    frames: Vec<PathBuf>,
    next: usize,
    frame_count: u64,
    exhausted: bool,
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if config.path.to_string_lossy().contains("://") {
            return Err(anyhow!(
                "file replay only supports local directories (got {})",
                config.path.display()
            ));
        }
        Ok(Self {
            config,
            frames: Vec::new(),
            next: 0,
            frame_count: 0,
            exhausted: false,
        })
    }

    fn load(&self, path: &Path, dst: &mut Frame) -> Result<()> {
        let image = image::open(path)
            .with_context(|| format!("decode frame {}", path.display()))?
            .to_rgb8();
        if image.dimensions() != (self.config.width, self.config.height) {
            return Err(anyhow::Error::new(VisionError::dimensions(
                (self.config.width, self.config.height),
                image.dimensions(),
            ))
            .context(format!("frame {}", path.display())));
        }
        crate::frame::check_frame(dst, self.config.width, self.config.height)?;
        dst.copy_from_slice(&image);
        Ok(())
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.config.path)
            .with_context(|| format!("read frame directory {}", self.config.path.display()))?;
        let mut frames = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if is_frame_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        if frames.is_empty() {
            log::warn!(
                "FileSource: no PNG/JPEG frames in {}",
                self.config.path.display()
            );
        }
        log::info!(
            "FileSource: {} frames from {}",
            frames.len(),
            self.config.path.display()
        );
        self.frames = frames;
        self.next = 0;
        self.exhausted = false;
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.frames.is_empty() && !self.exhausted
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn poll_frame(&mut self, dst: &mut Frame) -> Result<bool> {
        if !self.is_available() {
            return Ok(false);
        }
        let path = self.frames[self.next].clone();
        self.load(&path, dst)?;
        self.frame_count += 1;
        self.next += 1;
        if self.next == self.frames.len() {
            if self.config.repeat {
                self.next = 0;
            } else {
                self.exhausted = true;
            }
        }
        Ok(true)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.path.display().to_string(),
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}
