//! Host-driven frame loop.
//!
//! The host calls [`FrameLoop::tick`] once per update. A tick polls the
//! source, runs the processor on a new frame and presents both display
//! buffers. Nothing is queued: a frame that arrives while another is being
//! processed simply waits for the next tick. A failed capture counts as an
//! unavailable source; a processing error is returned to the caller.

use anyhow::{Context, Result};

use crate::detect::Detection;
use crate::display::{DisplaySurface, EDGES_WINDOW, PREVIEW_WINDOW};
use crate::frame::{blank_frame, Frame};
use crate::ingest::FrameSource;
use crate::processor::FrameProcessor;

/// Updates between periodic counter logs.
pub const STATS_INTERVAL: u64 = 30;

/// Result of one [`FrameLoop::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// The camera is missing or stopped delivering.
    SourceUnavailable,
    /// No new frame since the last tick; displays keep their last buffers.
    Idle,
    /// A new frame went through the pipeline.
    Processed(Option<Detection>),
}

/// Loop counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub updates: u64,
    pub frames: u64,
    pub displayed: u64,
    pub detections: u64,
}

pub struct FrameLoop {
    frame: Frame,
    stats: LoopStats,
}

impl FrameLoop {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: blank_frame(width, height),
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn tick(
        &mut self,
        source: &mut dyn FrameSource,
        processor: &mut FrameProcessor,
        surface: &mut dyn DisplaySurface,
    ) -> Result<CycleOutcome> {
        self.stats.updates += 1;
        let outcome = self.run_cycle(source, processor, surface);
        if self.stats.updates % STATS_INTERVAL == 0 {
            log::info!(
                "FrameLoop: updates={} frames={} displayed={} detections={}",
                self.stats.updates,
                self.stats.frames,
                self.stats.displayed,
                self.stats.detections
            );
        }
        outcome
    }

    fn run_cycle(
        &mut self,
        source: &mut dyn FrameSource,
        processor: &mut FrameProcessor,
        surface: &mut dyn DisplaySurface,
    ) -> Result<CycleOutcome> {
        if !source.is_available() {
            log::warn!("FrameLoop: camera unavailable ({})", source.stats().device);
            return Ok(CycleOutcome::SourceUnavailable);
        }
        match source.poll_frame(&mut self.frame) {
            Ok(true) => {}
            Ok(false) => return Ok(CycleOutcome::Idle),
            Err(err) => {
                log::warn!(
                    "FrameLoop: capture from {} failed: {:#}",
                    source.stats().device,
                    err
                );
                return Ok(CycleOutcome::SourceUnavailable);
            }
        }
        self.stats.frames += 1;

        let detection = processor
            .process(&self.frame)
            .with_context(|| format!("process frame {}", self.stats.frames))?;
        if let Some(found) = &detection {
            self.stats.detections += 1;
            log::debug!(
                "FrameLoop: dot at ({:.1}, {:.1}) area={}",
                found.center.x,
                found.center.y,
                found.area
            );
        }

        surface.present(PREVIEW_WINDOW, processor.preview())?;
        surface.present(EDGES_WINDOW, processor.edges())?;
        self.stats.displayed += 1;
        Ok(CycleOutcome::Processed(detection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplaySettings, HeldFrames, NullSurface, Orientation};
    use crate::ingest::{SourceStats, SyntheticConfig, SyntheticSource, OFFLINE_DEVICE};
    use crate::pipeline::DetectionSettings;

    fn processor(w: u32, h: u32) -> FrameProcessor {
        FrameProcessor::new(
            DetectionSettings::default(),
            DisplaySettings::default(),
            Orientation::default(),
            w,
            h,
        )
        .expect("processor")
    }

    fn synthetic(device: &str, polls_per_frame: u32) -> SyntheticSource {
        SyntheticSource::new(SyntheticConfig {
            device: device.to_string(),
            width: 160,
            height: 120,
            polls_per_frame,
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn unavailable_source_skips_cycle() -> Result<()> {
        let mut source = synthetic(OFFLINE_DEVICE, 1);
        source.connect()?;
        let mut proc = processor(160, 120);
        let mut surface = HeldFrames::new();
        let mut frame_loop = FrameLoop::new(160, 120);

        let outcome = frame_loop.tick(&mut source, &mut proc, &mut surface)?;
        assert_eq!(outcome, CycleOutcome::SourceUnavailable);
        assert_eq!(frame_loop.stats().updates, 1);
        assert_eq!(frame_loop.stats().frames, 0);
        assert_eq!(surface.presented(), 0);
        Ok(())
    }

    #[test]
    fn idle_ticks_keep_previous_display() -> Result<()> {
        let mut source = synthetic("stub://laser", 2);
        source.connect()?;
        let mut proc = processor(160, 120);
        let mut surface = HeldFrames::new();
        let mut frame_loop = FrameLoop::new(160, 120);

        assert_eq!(
            frame_loop.tick(&mut source, &mut proc, &mut surface)?,
            CycleOutcome::Idle
        );
        assert!(matches!(
            frame_loop.tick(&mut source, &mut proc, &mut surface)?,
            CycleOutcome::Processed(Some(_))
        ));
        let held = surface.latest(PREVIEW_WINDOW).cloned();
        assert_eq!(
            frame_loop.tick(&mut source, &mut proc, &mut surface)?,
            CycleOutcome::Idle
        );
        assert_eq!(surface.latest(PREVIEW_WINDOW).cloned(), held);

        let stats = frame_loop.stats();
        assert_eq!((stats.updates, stats.frames, stats.displayed), (3, 1, 1));
        assert_eq!(surface.presented(), 2);
        Ok(())
    }

    struct FailingSource;

    impl FrameSource for FailingSource {
        fn connect(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_available(&self) -> bool {
            true
        }
        fn dimensions(&self) -> (u32, u32) {
            (160, 120)
        }
        fn poll_frame(&mut self, _dst: &mut Frame) -> Result<bool> {
            Err(anyhow::anyhow!("capture failed"))
        }
        fn stats(&self) -> SourceStats {
            SourceStats::default()
        }
    }

    #[test]
    fn capture_errors_skip_the_cycle() -> Result<()> {
        let mut proc = processor(160, 120);
        let mut frame_loop = FrameLoop::new(160, 120);
        let outcome = frame_loop.tick(&mut FailingSource, &mut proc, &mut NullSurface)?;
        assert_eq!(outcome, CycleOutcome::SourceUnavailable);
        assert_eq!(frame_loop.stats().updates, 1);
        assert_eq!(frame_loop.stats().frames, 0);
        Ok(())
    }

    #[test]
    fn processor_size_mismatch_is_fatal() -> Result<()> {
        let mut source = synthetic("stub://laser", 1);
        source.connect()?;
        let mut proc = processor(80, 60);
        let mut frame_loop = FrameLoop::new(160, 120);
        let err = frame_loop
            .tick(&mut source, &mut proc, &mut NullSurface)
            .unwrap_err();
        assert!(err
            .chain()
            .any(|cause| cause.to_string().contains("dimension mismatch")));
        Ok(())
    }
}
