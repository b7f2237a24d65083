//! laserdotd - live laser dot tracker
//!
//! This daemon:
//! 1. Opens the configured frame source (synthetic, V4L2 or replay directory)
//! 2. Runs one detection pass per new frame
//! 3. Hands the annotated preview and edge images to the display surface
//! 4. Stops on Ctrl-C, after `--frames` processed frames, or after
//!    `--max-unavailable` cycles without a camera

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use laserdot::{
    open_source, CycleOutcome, FrameLoop, FrameProcessor, HeldFrames, LaserdotConfig,
};

#[derive(Parser, Debug)]
#[command(name = "laserdotd", about = "Track a laser dot in live camera frames")]
struct Args {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Source device, overrides the config (stub://..., /dev/videoN or a directory)
    #[arg(long, value_name = "DEVICE")]
    device: Option<String>,

    /// Stop after this many processed frames
    #[arg(long)]
    frames: Option<u64>,

    /// Stop after this many consecutive unavailable cycles (0 = keep waiting)
    #[arg(long, default_value_t = 0)]
    max_unavailable: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(path) = &args.config {
        std::env::set_var("LASERDOT_CONFIG", path);
    }
    let mut cfg = LaserdotConfig::load()?;
    if let Some(device) = args.device {
        cfg.source.device = device;
    }

    let mut source = open_source(&cfg.source)?;
    source
        .connect()
        .with_context(|| format!("connect source {}", cfg.source.device))?;

    let (width, height) = source.dimensions();
    let mut processor = FrameProcessor::new(
        cfg.detection.clone(),
        cfg.display.clone(),
        cfg.orientation,
        width,
        height,
    )?;
    let mut surface = HeldFrames::new();
    let mut frame_loop = FrameLoop::new(width, height);

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let period = if cfg.source.target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(1) / cfg.source.target_fps
    };

    log::info!(
        "laserdotd running. source={} ({}x{}), policy={:?}, threshold={}",
        cfg.source.device,
        width,
        height,
        cfg.detection.policy,
        cfg.detection.blob.threshold
    );

    let mut unavailable_streak = 0u64;
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        match frame_loop.tick(&mut *source, &mut processor, &mut surface)? {
            CycleOutcome::SourceUnavailable => {
                unavailable_streak += 1;
                if args.max_unavailable > 0 && unavailable_streak >= args.max_unavailable {
                    log::warn!("source unavailable for {unavailable_streak} cycles, stopping");
                    break;
                }
            }
            CycleOutcome::Idle => unavailable_streak = 0,
            CycleOutcome::Processed(detection) => {
                unavailable_streak = 0;
                if let Some(found) = detection {
                    println!("{}", serde_json::to_string(&found)?);
                }
            }
        }

        if let Some(limit) = args.frames {
            if frame_loop.stats().frames >= limit {
                break;
            }
        }
        if let Some(rest) = period.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let stats = frame_loop.stats();
    let source_stats = source.stats();
    log::info!(
        "laserdotd stopped: updates={} frames={} displayed={} detections={} captured={}",
        stats.updates,
        stats.frames,
        stats.displayed,
        stats.detections,
        source_stats.frames_captured
    );
    Ok(())
}
